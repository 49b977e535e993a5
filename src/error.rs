//! Error types shared by the generators and the export pipeline.

use thiserror::Error;

use crate::forms::ValidationErrors;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while validating, rendering or persisting documents.
#[derive(Error, Debug)]
pub enum Error {
    /// Form values did not pass validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The document could not be captured into a raster image.
    #[error("failed to capture document: {0}")]
    Capture(String),

    /// The captured image could not be encoded into the requested format.
    #[error("failed to encode {format}: {message}")]
    Encode {
        /// Target format name.
        format: &'static str,
        /// Description of the encoder failure.
        message: String,
    },

    /// genpdf failed while laying out the flow document.
    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] genpdf::error::Error),

    /// Fonts required for rendering could not be located or parsed.
    #[error("font error: {0}")]
    Font(String),

    /// The requested layout or format is not available for this document.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The recommendation service could not produce text.
    #[error("recommendation request failed: {0}")]
    Recommendation(String),

    /// The history store contents could not be read or written.
    #[error("history store error: {0}")]
    Storage(String),

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Capture(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Recommendation(format!("request timed out: {}", err))
        } else {
            Error::Recommendation(err.to_string())
        }
    }
}
