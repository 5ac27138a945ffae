use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid seed URL: {0}")]
    InvalidSeedUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
