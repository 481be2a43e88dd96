//! Error types for the renderer

use thiserror::Error;

/// Result type alias for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering answers
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize the renderer or one of its backends
    #[error("Renderer initialization failed: {0}")]
    InitializationError(String),

    /// The formula service answered with a non-success status
    #[error("Formula service returned HTTP {status} for `{latex}`")]
    ServiceStatus { status: u16, latex: String },

    /// Network error while talking to the formula service
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// A response body or file could not be decoded as an image
    #[error("Image decoding failed: {0}")]
    DecodeError(String),

    /// Failed to lay out or paint content
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to compose or serialize a document
    #[error("Document composition failed: {0}")]
    DocumentError(String),

    /// A font face could not be loaded or parsed
    #[error("Font loading failed: {0}")]
    FontError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            image::ImageError::Decoding(e) => Error::DecodeError(e.to_string()),
            other => Error::RenderError(other.to_string()),
        }
    }
}

#[cfg(feature = "codecogs")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}
