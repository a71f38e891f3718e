use std::path::PathBuf;
use thiserror::Error;

/// Errors outside the decode cascade. "No barcode" and "no data" are not
/// errors and never show up here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to load image {path:?}: {message}")]
    ImageLoad { path: PathBuf, message: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown code page label: {0}")]
    UnknownCodePage(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan cancelled before {0}")]
    Cancelled(&'static str),
}

pub type ScanResult<T> = Result<T, ScanError>;
