//! Domain model types for adboard.
//!
//! This module defines the core types used throughout adboard:
//! - [`ProviderId`] - Identifier for the external advertising platform
//! - [`TokenType`] - Classification of a stored credential
//! - [`CredentialRecord`] - The durable credential gating the ingestion job
//! - [`ProductCode`] - Stable product identifier used as the join key
//! - [`PerformanceRecord`] - A validated daily performance fact row
//! - [`EnrichedRecord`] - A fact row joined with its product name and cost metric

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::Secret;

/// Identifier for the external platform supplying advertising data.
///
/// Provider IDs are normalized to lowercase so that lookups against the
/// durable store are case-insensitive at the edges.
///
/// # Examples
///
/// ```
/// use adboard_core::ProviderId;
///
/// let provider = ProviderId::new("Facebook");
/// assert_eq!(provider.as_str(), "facebook");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a new provider ID.
    ///
    /// The ID is normalized to lowercase.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    /// Get the provider ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Classification of a stored credential.
///
/// Together with [`ProviderId`] this forms the uniqueness key of a
/// [`CredentialRecord`]: the store holds at most one record per pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// A long-lived token that does not need frequent re-issuance.
    LongLived,

    /// A custom token classification.
    Custom(String),
}

impl TokenType {
    /// Get the token type as a string for storage columns.
    pub fn as_str(&self) -> &str {
        match self {
            Self::LongLived => "long_lived",
            Self::Custom(s) => s,
        }
    }

    /// Parse a token type from its storage representation.
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "long_lived" => Self::LongLived,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The durable credential record for one `(provider, token_type)` pair.
///
/// A record is only ever written whole; partial updates do not exist. The
/// access token is wrapped in [`Secret`] so it cannot leak through logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// The external platform this credential belongs to.
    pub provider: ProviderId,

    /// The credential classification (identity together with `provider`).
    pub token_type: TokenType,

    /// The opaque bearer token.
    pub access_token: Secret,
}

impl CredentialRecord {
    /// Create a new credential record.
    pub fn new(
        provider: impl Into<ProviderId>,
        token_type: TokenType,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            token_type,
            access_token: Secret::new(access_token),
        }
    }

    /// Whether this record carries a usable token.
    ///
    /// An empty token is never considered valid; the lifecycle controller
    /// refuses to persist one in the first place.
    pub fn is_valid(&self) -> bool {
        !self.access_token.expose().is_empty()
    }
}

/// Stable identifier of a product, the join key into the mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductCode(String);

impl ProductCode {
    /// Create a new product code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Get the product code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProductCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Error rejecting a malformed performance row at construction time.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record {id}: spend must be non-negative, got {spend}")]
    NegativeSpend { id: i64, spend: f64 },

    #[error("record {id}: outcome count must be non-negative, got {count}")]
    NegativeOutcomeCount { id: i64, count: i64 },
}

/// A validated daily performance fact row.
///
/// Rows are append-only and owned by the external ingestion job; this
/// subsystem only reads them. Construction goes through [`try_new`] so a
/// row with negative spend or a negative outcome count never enters the
/// read model.
///
/// [`try_new`]: PerformanceRecord::try_new
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Unique identifier assigned by the store.
    pub id: i64,

    /// Foreign key into the product mapping table (may have no match).
    pub product_code: ProductCode,

    /// Calendar date the metrics pertain to.
    pub report_date: NaiveDate,

    /// Monetary amount spent, non-negative.
    pub spend: f64,

    /// Number of outcomes (e.g. leads) attributed to the spend, non-negative.
    pub outcome_count: i64,
}

impl PerformanceRecord {
    /// Construct a record, rejecting malformed input.
    pub fn try_new(
        id: i64,
        product_code: impl Into<ProductCode>,
        report_date: NaiveDate,
        spend: f64,
        outcome_count: i64,
    ) -> Result<Self, RecordError> {
        if spend < 0.0 || spend.is_nan() {
            return Err(RecordError::NegativeSpend { id, spend });
        }
        if outcome_count < 0 {
            return Err(RecordError::NegativeOutcomeCount {
                id,
                count: outcome_count,
            });
        }
        Ok(Self {
            id,
            product_code: product_code.into(),
            report_date,
            spend,
            outcome_count,
        })
    }

    /// Cost per outcome, or `None` when no outcomes were recorded.
    ///
    /// Derived, never stored. The zero guard keeps a zero-outcome day from
    /// rendering as infinity.
    pub fn cost_per_outcome(&self) -> Option<f64> {
        if self.outcome_count > 0 {
            Some(self.spend / self.outcome_count as f64)
        } else {
            None
        }
    }
}

/// A performance row joined with its resolved product name and cost metric.
///
/// This is the shape the presentation shell consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub id: i64,
    pub product_code: ProductCode,
    pub product_name: String,
    pub report_date: NaiveDate,
    pub spend: f64,
    pub outcome_count: i64,
    pub cost_per_outcome: Option<f64>,
}

impl EnrichedRecord {
    /// Join a fact row with its resolved product name.
    pub fn from_record(record: PerformanceRecord, product_name: impl Into<String>) -> Self {
        let cost_per_outcome = record.cost_per_outcome();
        Self {
            id: record.id,
            product_code: record.product_code,
            product_name: product_name.into(),
            report_date: record.report_date,
            spend: record.spend,
            outcome_count: record.outcome_count,
            cost_per_outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_provider_id_normalization() {
        let id = ProviderId::new("FACEBOOK");
        assert_eq!(id.as_str(), "facebook");
    }

    #[test]
    fn test_token_type_roundtrip() {
        assert_eq!(TokenType::LongLived.as_str(), "long_lived");
        assert_eq!(
            TokenType::from_str_loose("long_lived"),
            TokenType::LongLived
        );
        assert_eq!(
            TokenType::from_str_loose("session"),
            TokenType::Custom("session".to_string())
        );
    }

    #[test]
    fn test_credential_record_validity() {
        let record = CredentialRecord::new("facebook", TokenType::LongLived, "tok123");
        assert!(record.is_valid());

        let empty = CredentialRecord::new("facebook", TokenType::LongLived, "");
        assert!(!empty.is_valid());
    }

    #[test]
    fn test_performance_record_rejects_negative_spend() {
        let result = PerformanceRecord::try_new(1, "P1", date("2024-06-01"), -10.0, 5);
        assert!(matches!(result, Err(RecordError::NegativeSpend { .. })));
    }

    #[test]
    fn test_performance_record_rejects_negative_outcome_count() {
        let result = PerformanceRecord::try_new(1, "P1", date("2024-06-01"), 10.0, -1);
        assert!(matches!(
            result,
            Err(RecordError::NegativeOutcomeCount { .. })
        ));
    }

    #[test]
    fn test_cost_per_outcome() {
        let record = PerformanceRecord::try_new(1, "P1", date("2024-06-01"), 1000.0, 10).unwrap();
        assert_eq!(record.cost_per_outcome(), Some(100.0));
    }

    #[test]
    fn test_cost_per_outcome_zero_guard() {
        let record = PerformanceRecord::try_new(1, "P1", date("2024-06-01"), 1000.0, 0).unwrap();
        assert_eq!(record.cost_per_outcome(), None);
    }

    #[test]
    fn test_enriched_record_carries_cost() {
        let record = PerformanceRecord::try_new(7, "P1", date("2024-06-01"), 500.0, 5).unwrap();
        let enriched = EnrichedRecord::from_record(record, "Term Life");

        assert_eq!(enriched.id, 7);
        assert_eq!(enriched.product_name, "Term Life");
        assert_eq!(enriched.cost_per_outcome, Some(100.0));
    }
}
