//! Core traits for zonekeeper
//!
//! This module defines the seams between the lifecycle manager and the
//! systems it coordinates.
//!
//! - [`RemoteZone`]: Create/update/delete records in the authoritative zone
//! - [`RecordStore`]: Durable local mirror with atomic name reservation
//! - [`AccountDirectory`]: Owner status, plan and record limit

pub mod account_directory;
pub mod record_store;
pub mod remote_zone;

pub use account_directory::{Account, AccountDirectory, AccountStatus, OwnerStatus, Role};
pub use record_store::{RecordStore, RecordStoreFactory};
pub use remote_zone::{
    RecordChanges, RecordSpec, RemoteError, RemoteErrorClass, RemoteZone, RemoteZoneFactory,
};
