// # Record Store Trait
//
// Defines the interface for the durable local mirror of DNS records.
//
// ## Purpose
//
// The record store is the source of truth for ownership and quota:
// - Which owner holds which record
// - How many committed records each owner holds
// - Which `full_name`s are taken (including in-flight creates)
//
// ## Reservations
//
// A create first inserts a *reservation* (a record without `remote_id`).
// The reservation claims the name atomically so that two concurrent
// creates of the same name cannot both reach the remote zone. Once the
// remote create succeeds the reservation is committed with the remote
// identifier; if it fails the reservation is released.
//
// ## Implementations
//
// - Memory: tests and ephemeral runs
// - File-based: JSON file with atomic replace, shared between processes
//   through an advisory lock file

use crate::record::DnsRecord;
use async_trait::async_trait;

/// Trait for record store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
/// `reserve` must be atomic with respect to the name uniqueness check.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Implement locking/concurrency control for thread safety
/// - ✅ Cache state in memory (with explicit flush)
///
/// ## Forbidden Capabilities
/// - ❌ Call the remote zone (owned by `RecordManager`)
/// - ❌ Enforce quota or ownership (owned by `RecordManager`)
/// - ❌ Spawn background tasks
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a reservation, claiming its `full_name`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The name is now held by this reservation
    /// - `Err(Error::Conflict)`: Another record or reservation holds the name
    /// - `Err(Error)`: Storage error
    async fn reserve(&self, reservation: &DnsRecord) -> Result<(), crate::Error>;

    /// Turn a reservation into a durable record
    ///
    /// # Returns
    ///
    /// - `Ok(DnsRecord)`: The committed record
    /// - `Err(Error::NotFound)`: No reservation with this id
    /// - `Err(Error)`: Storage error; the reservation is left in place
    async fn commit(&self, id: &str, remote_id: &str) -> Result<DnsRecord, crate::Error>;

    /// Drop a reservation and free its name (no-op if it does not exist)
    async fn release(&self, id: &str) -> Result<(), crate::Error>;

    /// Get a committed record by local id
    ///
    /// Reservations are not visible through this method.
    async fn get(&self, id: &str) -> Result<Option<DnsRecord>, crate::Error>;

    /// Get the record or reservation currently holding `full_name`
    async fn find_by_name(&self, full_name: &str) -> Result<Option<DnsRecord>, crate::Error>;

    /// Overwrite a committed record (same id, same name)
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Replaced
    /// - `Err(Error::NotFound)`: No committed record with this id
    /// - `Err(Error)`: Storage error; the previous version is kept
    async fn replace(&self, record: &DnsRecord) -> Result<(), crate::Error>;

    /// Remove a committed record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: The removed record
    /// - `Ok(None)`: Nothing to remove
    /// - `Err(Error)`: Storage error; the record is kept
    async fn remove(&self, id: &str) -> Result<Option<DnsRecord>, crate::Error>;

    /// Count committed records held by `owner_id`
    async fn count_committed(&self, owner_id: &str) -> Result<usize, crate::Error>;

    /// Count committed records and reservations held by `owner_id`
    ///
    /// Read after a successful `reserve` to catch creates for the same owner
    /// that raced past the quota check from another process.
    async fn count_held(&self, owner_id: &str) -> Result<usize, crate::Error>;

    /// List committed records ordered by creation time
    ///
    /// With `Some(owner_id)` only that owner's records are returned.
    async fn list_committed(&self, owner_id: Option<&str>)
    -> Result<Vec<DnsRecord>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing record stores from configuration
#[async_trait]
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this record store
    async fn create(&self, config: &serde_json::Value)
    -> Result<Box<dyn RecordStore>, crate::Error>;
}
