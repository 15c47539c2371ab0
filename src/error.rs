use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgroError {
    #[error("Storage error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Setup prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Weather, AI or mail upstream failed or answered with something unusable.
    #[error("Upstream unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("{0} not found")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, AgroError>;
