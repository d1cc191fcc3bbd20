//! Top-level error types for adboard.

use thiserror::Error;

use crate::auth::AuthError;
use crate::model::RecordError;
use crate::store::StoreError;

/// Top-level error type encompassing all adboard errors.
#[derive(Debug, Error)]
pub enum AdboardError {
    /// Error from durable store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error from the external authorization flow.
    #[error("authorization error: {0}")]
    Auth(#[from] AuthError),

    /// A stored row failed domain validation.
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}
