// # File Record Store
//
// File-based implementation of RecordStore with crash recovery.
//
// ## Sharing
//
// Nothing is cached between calls. Each operation takes the file lock,
// reloads the table from disk, and for mutations writes it back before
// releasing the lock. Separate processes (one CLI invocation each) can work
// on the same file; a reservation made by one is a conflict for the other.
//
// ## Durability
//
// A mutation is applied to the freshly loaded table and written atomically.
// A failed write leaves the file unchanged.
//
// ## Reservations after a crash
//
// Reservations are persisted. A reservation older than
// `STALE_RESERVATION_SECS` cannot belong to a create still in flight; on open
// it is discarded with a warning naming the `full_name`, since the remote
// record may exist without a local counterpart.
//
// ## Recovery from backup
//
// The backup holds the table as it was before the last write. When it is
// used, every row is logged so an operator can compare it with the remote
// zone: a deleted record may be back, an update may be reverted.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "6f1c...": {
//       "id": "6f1c...",
//       "owner_id": "acct-1",
//       "subdomain_label": "www",
//       "full_name": "www.example.com",
//       "record_type": "A",
//       "content": "203.0.113.5",
//       "ttl": 1,
//       "proxied": false,
//       "remote_id": "372e67954025e0ba6aaa6d586b9e0b59",
//       "created_at": "2025-01-09T12:00:00Z",
//       "updated_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::json_file;
use super::table::RecordTable;
use crate::Error;
use crate::record::DnsRecord;
use crate::traits::record_store::{RecordStore, RecordStoreFactory};

/// Record file format version
const RECORD_FILE_VERSION: &str = "1.0";

/// Age after which a reservation is treated as left behind by a crash
///
/// Well above the largest remote timeout a create can wait on.
const STALE_RESERVATION_SECS: i64 = 300;

/// File-based record store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use zonekeeper_core::state::FileRecordStore;
/// use zonekeeper_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileRecordStore::new("/var/lib/zonekeeper/records.json").await?;
///     let all = store.list_committed(None).await?;
///     println!("{} records", all.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    /// Queues this process's callers before they contend for the file lock
    local: Mutex<()>,
    recovered: AtomicBool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct RecordFileFormat {
    version: String,
    records: HashMap<String, DnsRecord>,
}

impl FileRecordStore {
    /// Create or load a file record store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing file, falling back to the backup if corrupted
    /// 3. Discard stale reservations left behind by an interrupted create
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        json_file::ensure_parent_dir(&path).await?;

        let store = Self {
            path,
            local: Mutex::new(()),
            recovered: AtomicBool::new(false),
        };

        {
            let _local = store.local.lock().await;
            let _file = json_file::lock_exclusive(&store.path).await?;
            let mut table = store.load().await?;

            let cutoff = chrono::Utc::now() - chrono::Duration::seconds(STALE_RESERVATION_SECS);
            let stale = table.discard_reservations_before(cutoff);
            for reservation in &stale {
                tracing::warn!(
                    "Discarding unfinished create of '{}' (owner {}); \
                    the remote zone may hold an orphaned record",
                    reservation.full_name,
                    reservation.owner_id
                );
            }
            if !stale.is_empty() {
                store.persist(&table).await?;
            }
            tracing::debug!(
                "Loaded {} records from {}",
                table.records().len(),
                store.path.display()
            );
        }
        Ok(store)
    }

    /// Whether any load so far had to fall back to the backup file
    pub fn recovered_from_backup(&self) -> bool {
        self.recovered.load(Ordering::Relaxed)
    }

    /// Read the table from disk; the caller holds the file lock
    async fn load(&self) -> Result<RecordTable, Error> {
        let records = match json_file::load_with_recovery::<RecordFileFormat>(&self.path)
            .await
            .map_err(|e| Error::record_store(e.to_string()))?
        {
            Some(loaded) => {
                if loaded.doc.version != RECORD_FILE_VERSION {
                    tracing::warn!(
                        "Record file version mismatch: expected {}, got {}. \
                        Attempting to load anyway.",
                        RECORD_FILE_VERSION,
                        loaded.doc.version
                    );
                }
                if loaded.recovered {
                    self.report_recovery(&loaded.doc.records);
                }
                loaded.doc.records
            }
            None => HashMap::new(),
        };
        Ok(RecordTable::from_records(records))
    }

    fn report_recovery(&self, records: &HashMap<String, DnsRecord>) {
        self.recovered.store(true, Ordering::Relaxed);
        tracing::error!(
            "Record table rolled back to its backup at {}; \
            verify these {} rows against the remote zone",
            self.path.display(),
            records.len()
        );
        for record in records.values() {
            tracing::error!(
                "Unverified row {}: {} {} -> {} (owner {}, remote id {})",
                record.id,
                record.record_type,
                record.full_name,
                record.content,
                record.owner_id,
                record.remote_id.as_deref().unwrap_or("none")
            );
        }
    }

    /// Run `read` against the current table on disk
    async fn read<T>(&self, read: impl FnOnce(&RecordTable) -> T) -> Result<T, Error> {
        let _local = self.local.lock().await;
        let _file = json_file::lock_exclusive(&self.path).await?;
        let table = self.load().await?;
        Ok(read(&table))
    }

    /// Reload the table, apply `mutate`, and persist the result
    async fn write_through<T>(
        &self,
        mutate: impl FnOnce(&mut RecordTable) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let _local = self.local.lock().await;
        let _file = json_file::lock_exclusive(&self.path).await?;
        let mut table = self.load().await?;
        let out = mutate(&mut table)?;
        self.persist(&table).await?;
        Ok(out)
    }

    async fn persist(&self, table: &RecordTable) -> Result<(), Error> {
        let file = RecordFileFormat {
            version: RECORD_FILE_VERSION.to_string(),
            records: table.records().clone(),
        };
        json_file::write_atomic(&self.path, &file)
            .await
            .map_err(|e| Error::record_store(e.to_string()))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn reserve(&self, reservation: &DnsRecord) -> Result<(), Error> {
        self.write_through(|table| table.reserve(reservation)).await
    }

    async fn commit(&self, id: &str, remote_id: &str) -> Result<DnsRecord, Error> {
        self.write_through(|table| table.commit(id, remote_id)).await
    }

    async fn release(&self, id: &str) -> Result<(), Error> {
        self.write_through(|table| {
            if !table.release(id) {
                tracing::trace!("No reservation {} to release", id);
            }
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<DnsRecord>, Error> {
        self.read(|table| table.get_committed(id)).await
    }

    async fn find_by_name(&self, full_name: &str) -> Result<Option<DnsRecord>, Error> {
        self.read(|table| table.find_by_name(full_name)).await
    }

    async fn replace(&self, record: &DnsRecord) -> Result<(), Error> {
        self.write_through(|table| table.replace(record)).await
    }

    async fn remove(&self, id: &str) -> Result<Option<DnsRecord>, Error> {
        self.write_through(|table| Ok(table.remove_committed(id)))
            .await
    }

    async fn count_committed(&self, owner_id: &str) -> Result<usize, Error> {
        self.read(|table| table.count_committed(owner_id)).await
    }

    async fn count_held(&self, owner_id: &str) -> Result<usize, Error> {
        self.read(|table| table.count_held(owner_id)).await
    }

    async fn list_committed(&self, owner_id: Option<&str>) -> Result<Vec<DnsRecord>, Error> {
        self.read(|table| table.list_committed(owner_id)).await
    }

    async fn flush(&self) -> Result<(), Error> {
        // Every mutation is written through; nothing is buffered
        Ok(())
    }
}

/// Factory for the `file` record store type
///
/// Expects `{"path": "..."}`.
#[derive(Debug, Default)]
pub struct FileRecordStoreFactory;

#[async_trait]
impl RecordStoreFactory for FileRecordStoreFactory {
    async fn create(&self, config: &serde_json::Value) -> Result<Box<dyn RecordStore>, Error> {
        let path = config
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::config("file record store requires a 'path'"))?;
        Ok(Box::new(FileRecordStore::new(path).await?))
    }
}
