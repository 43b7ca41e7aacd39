use thiserror::Error;

use crate::exchange::InputFormat;
use crate::transform::TransformKind;

/// Errors raised when the feature registry refuses a mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("Invalid feature collection: {reason}")]
    InvalidFeatureCollection { reason: String },
}

/// Bad or missing local input. These are caught before any request is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("There are no active features to transform")]
    NoActiveFeatures,

    #[error("{0} requires a non-empty operand collection")]
    MissingOperand(TransformKind),

    #[error("{name} must be a positive integer, got {input:?}")]
    InvalidParameter { name: &'static str, input: String },

    #[error("{0} is required")]
    MissingParameter(&'static str),

    #[error("An input CRS is required for {0} uploads")]
    MissingInputCrs(InputFormat),

    #[error("The selected file is empty")]
    EmptyUpload,
}

/// Failures reported by, or while talking to, the remote transform service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Non-success reply whose body carried a JSON `message`.
    #[error("error from geoflip - {message}")]
    Remote { status: u16, message: String },

    /// Non-success reply whose body could not be read as a JSON error.
    #[error("An unexpected error occurred. Please try again.")]
    UnreadableErrorBody { status: u16 },

    /// The request never produced a reply.
    #[error("An unexpected error occurred - {0}")]
    Transport(String),

    /// A success reply that did not decode as a feature collection.
    #[error("An unexpected error occurred - {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by the transform, import and export flows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("A request is already in flight")]
    Busy,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A file picked or dropped for upload that cannot be sent.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("{name} is not a supported upload (expected .zip, .dxf or .gpkg)")]
    Unsupported { name: String },

    #[error("Failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} has no readable contents")]
    NoContents { name: String },
}
