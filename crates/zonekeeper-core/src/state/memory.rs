// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Crash Behavior
//
// - All records are lost on restart/crash
// - Remote records created earlier become orphans that only an operator
//   can clean up
//
// ## When to Use
//
// - Testing environments
// - Short-lived demonstrations

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::table::RecordTable;
use crate::Error;
use crate::record::DnsRecord;
use crate::traits::record_store::{RecordStore, RecordStoreFactory};

/// In-memory record store implementation
///
/// # Example
///
/// ```rust,no_run
/// use zonekeeper_core::state::MemoryRecordStore;
/// use zonekeeper_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::new();
///     assert_eq!(store.count_committed("owner-1").await?, 0);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<RecordTable>>,
}

impl MemoryRecordStore {
    /// Create a new empty memory record store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, reservations included
    pub async fn len(&self) -> usize {
        self.inner.read().await.records().len()
    }

    /// Check if the store holds no rows at all
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn reserve(&self, reservation: &DnsRecord) -> Result<(), Error> {
        self.inner.write().await.reserve(reservation)
    }

    async fn commit(&self, id: &str, remote_id: &str) -> Result<DnsRecord, Error> {
        self.inner.write().await.commit(id, remote_id)
    }

    async fn release(&self, id: &str) -> Result<(), Error> {
        self.inner.write().await.release(id);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<DnsRecord>, Error> {
        Ok(self.inner.read().await.get_committed(id))
    }

    async fn find_by_name(&self, full_name: &str) -> Result<Option<DnsRecord>, Error> {
        Ok(self.inner.read().await.find_by_name(full_name))
    }

    async fn replace(&self, record: &DnsRecord) -> Result<(), Error> {
        self.inner.write().await.replace(record)
    }

    async fn remove(&self, id: &str) -> Result<Option<DnsRecord>, Error> {
        Ok(self.inner.write().await.remove_committed(id))
    }

    async fn count_committed(&self, owner_id: &str) -> Result<usize, Error> {
        Ok(self.inner.read().await.count_committed(owner_id))
    }

    async fn count_held(&self, owner_id: &str) -> Result<usize, Error> {
        Ok(self.inner.read().await.count_held(owner_id))
    }

    async fn list_committed(&self, owner_id: Option<&str>) -> Result<Vec<DnsRecord>, Error> {
        Ok(self.inner.read().await.list_committed(owner_id))
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}

/// Factory for the `memory` record store type
#[derive(Debug, Default)]
pub struct MemoryRecordStoreFactory;

#[async_trait]
impl RecordStoreFactory for MemoryRecordStoreFactory {
    async fn create(&self, _config: &serde_json::Value) -> Result<Box<dyn RecordStore>, Error> {
        Ok(Box::new(MemoryRecordStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordType, Ttl};

    fn reservation(owner: &str, label: &str) -> DnsRecord {
        DnsRecord::reservation(
            owner,
            label,
            format!("{}.example.com", label),
            RecordType::A,
            "203.0.113.5",
            Ttl::Auto,
            false,
        )
    }

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemoryRecordStore::new();
        assert!(store.is_empty().await);

        let record = reservation("alice", "www");
        store.reserve(&record).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert!(store.get(&record.id).await.unwrap().is_none());

        store.commit(&record.id, "remote-1").await.unwrap();
        assert_eq!(store.count_committed("alice").await.unwrap(), 1);
        assert_eq!(store.list_committed(Some("alice")).await.unwrap().len(), 1);
        assert!(store.list_committed(Some("bob")).await.unwrap().is_empty());

        let removed = store.remove(&record.id).await.unwrap();
        assert_eq!(removed.unwrap().remote_id.as_deref(), Some("remote-1"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_state() {
        let store = MemoryRecordStore::new();
        let clone = store.clone();

        store.reserve(&reservation("alice", "www")).await.unwrap();
        let err = clone.reserve(&reservation("bob", "www")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_creation() {
        let store = MemoryRecordStore::new();
        for label in ["first", "second", "third"] {
            let record = reservation("alice", label);
            store.reserve(&record).await.unwrap();
            store.commit(&record.id, label).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let names: Vec<String> = store
            .list_committed(None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.subdomain_label)
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }
}
