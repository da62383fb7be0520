//! Error types for model conversion.

use thiserror::Error;

/// Result type alias using ConvertError.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Main error type for conversion operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Failed to read or write a ZIP archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to parse or emit JSON data.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to encode the texture.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse an OBJ file.
    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),

    /// Conversion options break the caller contract.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// The model format could not be determined.
    #[error("Unsupported model format: {0}")]
    UnsupportedFormat(String),

    /// The model file is malformed.
    #[error("Import failed: {0}")]
    Import(String),

    /// Mesh buffers are inconsistent (index out of range, odd buffer lengths).
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Failed to write the output bundle.
    #[error("Export failed: {0}")]
    Export(String),
}
