pub mod config;
pub mod error;
pub mod extractors;
pub mod pipeline;
pub mod results;
pub mod runner;

pub use error::HeybenchError;
