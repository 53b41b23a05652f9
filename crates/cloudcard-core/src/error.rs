//! Error types for cloudcard

use crate::component::{ComponentId, ComponentKindTag};
use thiserror::Error;

/// Result type alias using cloudcard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cloudcard operations
///
/// None of these are fatal to a session: each one is scoped to the single
/// operation that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// No component (or pending upload) with this id exists
    #[error("Component {0} not found")]
    NotFound(ComponentId),

    /// The component exists but is of a different kind than the operation expects
    #[error("Component {id} is a {actual} component, expected {expected}")]
    TypeMismatch {
        id: ComponentId,
        expected: ComponentKindTag,
        actual: ComponentKindTag,
    },

    /// The operation needs a selected component and none is selected
    #[error("No component selected")]
    NoSelection,

    /// User input rejected before any state was touched
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uploaded vector content could not be parsed or rendered
    #[error("Malformed vector content: {0}")]
    MalformedVector(String),

    /// Text could not be rasterized
    #[error("Text rasterization failed: {0}")]
    Text(String),

    /// Export failed
    #[error("Export failed: {0}")]
    Export(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding/decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON (config or glTF document) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
