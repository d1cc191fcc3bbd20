//! Product-code to product-name resolution.
//!
//! The mapping table is owned by an external reference-data process; this
//! subsystem bulk-loads it on each dashboard view load and resolves codes
//! with a fallback, so the read model never renders an empty label. This
//! is deliberately not a general-purpose cache; volumes are small.

use std::collections::HashMap;

use crate::store::{ReportStore, StoreError};

/// A bulk-loaded product-code → product-name table.
///
/// Duplicate codes keep the first-seen name; later duplicates are ignored.
/// That first-write-wins policy is load-bearing for reproducible labels
/// when the reference data contains conflicting rows.
///
/// # Example
///
/// ```
/// use adboard_core::mapping::ProductNames;
///
/// let names = ProductNames::from_rows(vec![
///     ("P1".to_string(), "Term Life".to_string()),
/// ]);
/// assert_eq!(names.resolve("P1"), "Term Life");
/// assert_eq!(names.resolve("P9"), "P9");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProductNames {
    names: HashMap<String, String>,
}

impl ProductNames {
    /// Bulk-load the mapping table from the durable store.
    pub async fn load(store: &dyn ReportStore) -> Result<Self, StoreError> {
        let rows = store.product_mappings().await?;
        let table = Self::from_rows(rows);
        tracing::debug!(count = table.len(), "product mappings loaded");
        Ok(table)
    }

    /// Build a table from raw rows, applying first-seen-wins on duplicates.
    pub fn from_rows(rows: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut names = HashMap::new();
        for (code, name) in rows {
            names.entry(code).or_insert(name);
        }
        Self { names }
    }

    /// Resolve a product code to its display name.
    ///
    /// Returns the code itself unchanged when no mapping exists; an
    /// unmapped code is a graceful degradation, not an error.
    pub fn resolve<'a>(&'a self, code: &'a str) -> &'a str {
        self.names.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Number of distinct codes in the table.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
