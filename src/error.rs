//! Error types for fedround

use thiserror::Error;

/// Error raised by a [`Client`](crate::Client) implementation.
///
/// The coordinator never inspects it; it is carried unchanged as the
/// `source` of [`CoordinatorError::Client`].
pub type ClientError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All possible errors in fedround
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// A client failed while loading, training or testing
    #[error("Client '{client_id}' failed during {stage}: {source}")]
    Client {
        /// Identifier of the failing client
        client_id: String,
        /// Which call failed ("load", "train" or "test")
        stage: &'static str,
        /// Error returned by the client, unmodified
        #[source]
        source: ClientError,
    },

    /// A client update does not carry the global parameter key set
    #[error("Schema mismatch in update {update}: {detail}")]
    SchemaMismatch {
        /// Position of the offending update in the update log
        update: usize,
        /// Missing or unexpected parameter names
        detail: String,
    },

    /// A client update holds a tensor whose shape differs from the global one
    #[error("Shape mismatch for parameter '{key}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Parameter name
        key: String,
        /// Shape in the global model
        expected: Vec<usize>,
        /// Shape in the client update
        actual: Vec<usize>,
    },

    /// The same client appears twice in one parallel dispatch
    #[error("Client '{0}' listed more than once in a parallel dispatch")]
    DuplicateClient(String),

    /// Checkpoint file is not a fedround checkpoint or has an unknown version
    #[error("Invalid checkpoint: {0}")]
    Checkpoint(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Array shape error
    #[error("Array shape error: {0}")]
    Shape(String),
}

impl From<ndarray::ShapeError> for CoordinatorError {
    fn from(e: ndarray::ShapeError) -> Self {
        CoordinatorError::Shape(e.to_string())
    }
}

impl From<bincode::Error> for CoordinatorError {
    fn from(e: bincode::Error) -> Self {
        CoordinatorError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(e: serde_json::Error) -> Self {
        CoordinatorError::Serialization(e.to_string())
    }
}
