//! In-memory store implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::model::{CredentialRecord, PerformanceRecord, ProviderId, TokenType};

use super::{CredentialStore, ReportStore, StoreError};

/// In-memory store for testing and development.
///
/// This store is not persistent; data is lost when the process exits.
/// Performance rows and mapping rows are seeded through [`push_performance`]
/// and [`push_mapping`] to simulate what the external ingestion and
/// reference-data processes would have written.
///
/// # Thread Safety
///
/// This implementation uses interior mutability via `RwLock` and is
/// safe to share across threads.
///
/// [`push_performance`]: MemoryStore::push_performance
/// [`push_mapping`]: MemoryStore::push_mapping
pub struct MemoryStore {
    credentials: RwLock<HashMap<(String, String), CredentialRecord>>,
    performance: RwLock<Vec<PerformanceRecord>>,
    mappings: RwLock<Vec<(String, String)>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            credentials: RwLock::new(HashMap::new()),
            performance: RwLock::new(Vec::new()),
            mappings: RwLock::new(Vec::new()),
        }
    }

    /// Append a performance fact row, as the external ingestion job would.
    pub fn push_performance(&self, record: PerformanceRecord) {
        self.performance
            .write()
            .expect("performance lock poisoned")
            .push(record);
    }

    /// Append a product mapping row, as the reference-data process would.
    ///
    /// Duplicates are stored as given; first-seen-wins is the resolver's
    /// job, not the store's.
    pub fn push_mapping(&self, code: impl Into<String>, name: impl Into<String>) {
        self.mappings
            .write()
            .expect("mappings lock poisoned")
            .push((code.into(), name.into()));
    }

    fn key(provider: &ProviderId, token_type: &TokenType) -> (String, String) {
        (provider.as_str().to_string(), token_type.as_str().to_string())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.credentials.read().map(|d| d.len()).unwrap_or(0);
        f.debug_struct("MemoryStore")
            .field("credential_count", &count)
            .finish()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_current(
        &self,
        provider: &ProviderId,
        token_type: &TokenType,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let data = self.credentials.read().map_err(|e| StoreError::Backend {
            message: format!("lock poisoned: {}", e),
        })?;
        Ok(data.get(&Self::key(provider, token_type)).cloned())
    }

    async fn upsert(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let mut data = self.credentials.write().map_err(|e| StoreError::Backend {
            message: format!("lock poisoned: {}", e),
        })?;
        data.insert(
            Self::key(&record.provider, &record.token_type),
            record.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn recent_performance(
        &self,
        limit: u32,
    ) -> Result<Vec<PerformanceRecord>, StoreError> {
        let data = self.performance.read().map_err(|e| StoreError::Backend {
            message: format!("lock poisoned: {}", e),
        })?;
        let mut rows: Vec<PerformanceRecord> = data.clone();
        rows.sort_by(|a, b| b.report_date.cmp(&a.report_date));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn product_mappings(&self) -> Result<Vec<(String, String)>, StoreError> {
        let data = self.mappings.read().map_err(|e| StoreError::Backend {
            message: format!("lock poisoned: {}", e),
        })?;
        Ok(data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenType;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_upsert_and_get() {
        let store = MemoryStore::new();
        let record = CredentialRecord::new("facebook", TokenType::LongLived, "tok123");

        store.upsert(&record).await.unwrap();
        let retrieved = store
            .get_current(&record.provider, &record.token_type)
            .await
            .unwrap();

        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().access_token.expose(), "tok123");
    }

    #[tokio::test]
    async fn test_memory_store_get_absent() {
        let store = MemoryStore::new();
        let result = store
            .get_current(&ProviderId::new("facebook"), &TokenType::LongLived)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_upsert_replaces() {
        let store = MemoryStore::new();
        let provider = ProviderId::new("facebook");

        for token in ["first", "second", "third"] {
            let record = CredentialRecord::new(provider.clone(), TokenType::LongLived, token);
            store.upsert(&record).await.unwrap();
        }

        let retrieved = store
            .get_current(&provider, &TokenType::LongLived)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved.access_token.expose(), "third");
    }

    #[tokio::test]
    async fn test_memory_store_recent_performance_ordering() {
        let store = MemoryStore::new();
        for (id, day) in [(1, "2024-06-01"), (2, "2024-06-03"), (3, "2024-06-02")] {
            store.push_performance(
                PerformanceRecord::try_new(id, "P1", date(day), 100.0, 1).unwrap(),
            );
        }

        let rows = store.recent_performance(2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 2);
        assert_eq!(rows[1].id, 3);
    }

    #[tokio::test]
    async fn test_memory_store_mappings_in_insertion_order() {
        let store = MemoryStore::new();
        store.push_mapping("A", "Widget");
        store.push_mapping("A", "Gadget");

        let rows = store.product_mappings().await.unwrap();
        assert_eq!(rows[0], ("A".to_string(), "Widget".to_string()));
        assert_eq!(rows[1], ("A".to_string(), "Gadget".to_string()));
    }
}
