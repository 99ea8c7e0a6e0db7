use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation interrupted by shutdown signal")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, AppError>;
