use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
