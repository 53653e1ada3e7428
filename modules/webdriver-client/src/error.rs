use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebDriverError>;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("WebDriver error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("No such element")]
    NoSuchElement,

    #[error("Stale element reference")]
    StaleElement,

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl WebDriverError {
    /// True for failures tied to one element lookup rather than the session:
    /// callers treat these as "the element is not there", not as a transport
    /// problem.
    pub fn is_element_missing(&self) -> bool {
        matches!(
            self,
            WebDriverError::NoSuchElement | WebDriverError::StaleElement
        )
    }
}

impl From<reqwest::Error> for WebDriverError {
    fn from(err: reqwest::Error) -> Self {
        WebDriverError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for WebDriverError {
    fn from(err: serde_json::Error) -> Self {
        WebDriverError::Protocol(err.to_string())
    }
}
