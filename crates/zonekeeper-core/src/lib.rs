// # zonekeeper-core
//
// Core library for managing DNS records under a shared base domain.
//
// ## Architecture Overview
//
// - **RemoteZone**: Trait for creating, updating and deleting records in the
//   authoritative zone (e.g. Cloudflare)
// - **RecordStore**: Trait for the durable local mirror, with atomic name
//   reservation
// - **AccountDirectory**: Trait for owner status and plan
// - **RecordManager**: Enforces quota, uniqueness and ownership and keeps the
//   two stores in agreement
// - **ProviderRegistry**: Plugin-based registry for remote zones and stores
//
// ## Design Principles
//
// 1. **A record exists iff it exists on both sides**: failures after a partial
//    success are compensated or reported, never ignored
// 2. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 3. **Library-First**: The CLI is a thin layer over this crate
// 4. **No zone scans**: The local store is the source of truth for ownership

pub mod accounts;
pub mod config;
pub mod error;
pub mod manager;
pub mod plan;
pub mod record;
pub mod registry;
pub mod settings;
pub mod state;
pub mod traits;
pub mod validate;

// Re-export core types for convenience
pub use accounts::{FileAccountDirectory, MemoryAccountDirectory};
pub use config::{ManagerConfig, ProviderConfig, RecordStoreConfig, StoreConfig, ZonekeeperConfig};
pub use error::{Error, Result};
pub use manager::{
    CreateRecord, ManagerError, ManagerEvent, ManagerResult, RecordManager, UpdateRecord,
};
pub use plan::{Plan, Quota};
pub use record::{DnsRecord, RecordType, Ttl};
pub use registry::ProviderRegistry;
pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsPatch, SettingsStore, SiteSettings};
pub use state::{FileRecordStore, MemoryRecordStore};
pub use traits::{AccountDirectory, RecordStore, RemoteZone};
