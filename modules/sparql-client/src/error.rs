use thiserror::Error;

pub type Result<T> = std::result::Result<T, SparqlError>;

#[derive(Debug, Error)]
pub enum SparqlError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing binding: {0}")]
    MissingBinding(String),
}

impl From<reqwest::Error> for SparqlError {
    fn from(err: reqwest::Error) -> Self {
        SparqlError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SparqlError {
    fn from(err: serde_json::Error) -> Self {
        SparqlError::Parse(err.to_string())
    }
}
