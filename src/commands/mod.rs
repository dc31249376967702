pub mod serve;

pub use serve::execute_serve;
