use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("malformed coordinates {value:?}: {reason}")]
    Coordinates { value: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
