//! Plugin-based provider registry
//!
//! The registry allows remote zones and record stores to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zonekeeper_core::registry::ProviderRegistry;
//! use zonekeeper_core::config::ProviderConfig;
//!
//! // Built-in record stores (memory, file) are already registered
//! let registry = ProviderRegistry::new();
//!
//! // Providers register themselves
//! zonekeeper_provider_cloudflare::register(&registry);
//!
//! let zone = registry.create_remote_zone(&config.provider)?;
//! let store = registry.create_record_store(&config.record_store).await?;
//! ```

use crate::config::{ProviderConfig, RecordStoreConfig};
use crate::error::{Error, Result};
use crate::state::{FileRecordStoreFactory, MemoryRecordStoreFactory};
use crate::traits::{RecordStore, RecordStoreFactory, RemoteZone, RemoteZoneFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of remote zone and record store factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
pub struct ProviderRegistry {
    /// Registered remote zone factories
    remote_zones: RwLock<HashMap<String, Box<dyn RemoteZoneFactory>>>,

    /// Registered record store factories
    record_stores: RwLock<HashMap<String, Arc<dyn RecordStoreFactory>>>,
}

impl ProviderRegistry {
    /// Create a registry with the built-in record stores registered
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register_record_store("memory", Box::new(MemoryRecordStoreFactory));
        registry.register_record_store("file", Box::new(FileRecordStoreFactory));
        registry
    }

    /// Create a registry without any factory
    pub fn empty() -> Self {
        Self {
            remote_zones: RwLock::new(HashMap::new()),
            record_stores: RwLock::new(HashMap::new()),
        }
    }

    /// Register a remote zone factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "cloudflare")
    /// - `factory`: Factory object for creating remote zone instances
    pub fn register_remote_zone(&self, name: impl Into<String>, factory: Box<dyn RemoteZoneFactory>) {
        self.remote_zones
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Register a record store factory
    pub fn register_record_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RecordStoreFactory>,
    ) {
        self.record_stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::from(factory));
    }

    /// Create a remote zone from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn RemoteZone>)`: Created remote zone
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_remote_zone(&self, config: &ProviderConfig) -> Result<Box<dyn RemoteZone>> {
        let provider_type = config.type_name();
        let zones = self
            .remote_zones
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = zones
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// Create a record store from configuration
    pub async fn create_record_store(
        &self,
        config: &RecordStoreConfig,
    ) -> Result<Box<dyn RecordStore>> {
        let store_type = config.type_name();
        let factory = self
            .record_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(store_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown record store type: {}", store_type)))?;

        // The lock is released before the async create
        factory.create(&config.factory_config()?).await
    }

    /// List all registered provider types
    pub fn list_remote_zones(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .remote_zones
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// List all registered record store types
    pub fn list_record_stores(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .record_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_remote_zone(&self, name: &str) -> bool {
        self.remote_zones
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
