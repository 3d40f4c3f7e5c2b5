use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// The request never got a response: connect failures, timeouts and
    /// dropped connections. Decode and builder errors are not included.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(e) if e.is_connect() || e.is_timeout() || e.is_request())
    }

    /// Transient failures worth another attempt. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => match e.status() {
                Some(status) => status.is_server_error() || status.as_u16() == 429,
                None => self.is_transport(),
            },
            Error::Io(_) | Error::Inference(_) | Error::Scraping(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
