pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod shutdown;
pub mod types;
pub mod vote;
