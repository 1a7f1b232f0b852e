//! Error types for the engine
//!
//! Every fallible operation returns [`Result`]. Shape disagreements, unknown
//! layer kinds and lifecycle violations are reported at the point they are
//! detected and never retried.

use thiserror::Error;

/// Errors raised by matrices, layers, backends and configuration loading.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Shape mismatch in {operation}: expected {expected}, got {actual}")]
    ShapeMismatch {
        operation: &'static str,
        expected: String,
        actual: String,
    },

    #[error("{kind} layer is not supported by this backend")]
    UnsupportedLayerKind { kind: String },

    #[error("{layer} layer used before initialize ({operation})")]
    UninitializedUse {
        layer: &'static str,
        operation: &'static str,
    },

    #[error("Operation not implemented by this backend: {operation}")]
    UnimplementedOperation { operation: &'static str },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetworkError {
    pub(crate) fn shape_mismatch(
        operation: &'static str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        NetworkError::ShapeMismatch {
            operation,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        NetworkError::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn uninitialized(layer: &'static str, operation: &'static str) -> Self {
        NetworkError::UninitializedUse { layer, operation }
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;
