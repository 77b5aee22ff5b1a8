//! Error types for the render service

use thiserror::Error;

/// Result type alias for render operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning HTML into a PDF
#[derive(Error, Debug)]
pub enum Error {
    /// The request was missing required input; nothing was acquired
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The browser process could not be started
    #[error("Failed to launch browser: {0}")]
    ProcessAcquisition(String),

    /// The page did not reach network idle in time
    #[error("Page load timed out after {0}ms")]
    LoadTimeout(u64),

    /// Loading the document failed for a reason other than the timeout
    #[error("Failed to load content: {0}")]
    Load(String),

    /// Printing the loaded page failed
    #[error("PDF capture failed: {0}")]
    Capture(String),

    /// Releasing the browser process failed
    #[error("Failed to close browser: {0}")]
    Cleanup(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error was caused by the caller rather than the engine
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
