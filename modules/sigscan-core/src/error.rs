use thiserror::Error;

pub type Result<T> = std::result::Result<T, SigscanError>;

#[derive(Error, Debug)]
pub enum SigscanError {
    #[error("Remote store error: {0}")]
    Remote(#[from] sparql_client::SparqlError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Unsupported identifier: {0}")]
    UnsupportedIdentifier(String),

    #[error("Corrupt cache artifact {path}: {reason}")]
    CorruptCache { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<lopdf::Error> for SigscanError {
    fn from(err: lopdf::Error) -> Self {
        SigscanError::Pdf(err.to_string())
    }
}
