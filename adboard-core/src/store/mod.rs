//! Durable store abstraction.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`StoreError`] - Error type for store operations
//! - [`CredentialStore`] - Trait for the credential side of the durable store
//! - [`ReportStore`] - Trait for the read-only fact/mapping side
//! - [`MemoryStore`] - In-memory implementation for testing
//! - [`SqliteStore`] - SQLite implementation backing production deployments
//!
//! Absence of a credential is a normal outcome (`Ok(None)`), never an error.
//! There is deliberately no caching layer in front of either trait: every
//! status check re-reads the durable store, trading latency for freshness.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::model::{CredentialRecord, PerformanceRecord, ProviderId, TokenType};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the
/// value, and the backing memory is zeroed on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Error type for durable store operations.
///
/// Backend messages are preserved verbatim so the operator sees the actual
/// diagnostic, not a paraphrase.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend reported an error.
    #[error("store error: {message}")]
    Backend { message: String },

    /// A stored row failed validation when mapped into the domain model.
    #[error("malformed row: {message}")]
    MalformedRow { message: String },

    /// The operation did not complete within its deadline.
    #[error("store operation timed out: {operation}")]
    Timeout { operation: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}

impl From<crate::model::RecordError> for StoreError {
    fn from(err: crate::model::RecordError) -> Self {
        Self::MalformedRow {
            message: err.to_string(),
        }
    }
}

/// The credential side of the durable store.
///
/// At most one [`CredentialRecord`] exists per `(provider, token_type)`
/// pair; `upsert` resolves conflicts by atomic replacement at the storage
/// layer, so concurrent writers converge on exactly one final value.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Retrieve the current credential for a `(provider, token_type)` pair.
    ///
    /// Returns `Ok(None)` if no record exists.
    async fn get_current(
        &self,
        provider: &ProviderId,
        token_type: &TokenType,
    ) -> Result<Option<CredentialRecord>, StoreError>;

    /// Insert or replace the credential for its `(provider, token_type)` key.
    ///
    /// A save is all-or-nothing; there are no partial updates.
    async fn upsert(&self, record: &CredentialRecord) -> Result<(), StoreError>;
}

/// The read-only fact and reference-data side of the durable store.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Load the most recent performance rows, ordered by report date
    /// descending, at most `limit` of them.
    async fn recent_performance(&self, limit: u32)
        -> Result<Vec<PerformanceRecord>, StoreError>;

    /// Load all product mapping rows `(product_code, product_name)` in
    /// storage order. Duplicate codes are returned as stored; the resolver
    /// applies the first-seen-wins policy.
    async fn product_mappings(&self) -> Result<Vec<(String, String)>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secret_display_redacted() {
        let secret = Secret::new("super-secret");
        let display = format!("{}", secret);
        assert!(!display.contains("super-secret"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn test_store_error_preserves_backend_message() {
        let err = StoreError::Backend {
            message: "disk I/O error".to_string(),
        };
        assert!(err.to_string().contains("disk I/O error"));
    }
}
