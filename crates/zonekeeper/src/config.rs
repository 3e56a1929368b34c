//! Environment configuration
//!
//! All configuration is read from `ZONEKEEPER_*` environment variables.

use anyhow::Result;
use std::env;
use tracing::Level;
use zonekeeper_core::config::{MAX_REMOTE_TIMEOUT_SECS, MIN_REMOTE_TIMEOUT_SECS};
use zonekeeper_core::{
    ManagerConfig, ProviderConfig, RecordStoreConfig, StoreConfig, ZonekeeperConfig,
};

const DEFAULT_STATE_STORE_PATH: &str = "zonekeeper/records.json";
const DEFAULT_ACCOUNTS_PATH: &str = "zonekeeper/accounts.json";
const DEFAULT_SETTINGS_PATH: &str = "zonekeeper/settings.json";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    base_domain: Option<String>,
    provider_type: String,
    provider_api_token: Option<String>,
    provider_zone_id: Option<String>,
    state_store_type: String,
    state_store_path: String,
    accounts_path: String,
    settings_path: String,
    remote_timeout_secs: Option<u64>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Configuration built from the given variables only
    #[cfg(test)]
    pub fn for_tests(vars: &[(&str, &str)]) -> Self {
        let vars: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::from_lookup(|key| vars.get(key).cloned()).expect("test configuration parses")
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let remote_timeout_secs = match non_empty("ZONEKEEPER_REMOTE_TIMEOUT_SECS") {
            Some(raw) => Some(raw.trim().parse().map_err(|_| {
                anyhow::anyhow!(
                    "ZONEKEEPER_REMOTE_TIMEOUT_SECS must be a number of seconds. Got: {}",
                    raw
                )
            })?),
            None => None,
        };

        Ok(Self {
            base_domain: non_empty("ZONEKEEPER_BASE_DOMAIN"),
            provider_type: non_empty("ZONEKEEPER_PROVIDER_TYPE")
                .unwrap_or_else(|| "cloudflare".to_string()),
            provider_api_token: non_empty("ZONEKEEPER_PROVIDER_API_TOKEN"),
            provider_zone_id: non_empty("ZONEKEEPER_PROVIDER_ZONE_ID"),
            state_store_type: non_empty("ZONEKEEPER_STATE_STORE_TYPE")
                .unwrap_or_else(|| "file".to_string()),
            state_store_path: non_empty("ZONEKEEPER_STATE_STORE_PATH")
                .unwrap_or_else(|| DEFAULT_STATE_STORE_PATH.to_string()),
            accounts_path: non_empty("ZONEKEEPER_ACCOUNTS_PATH")
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_PATH.to_string()),
            settings_path: non_empty("ZONEKEEPER_SETTINGS_PATH")
                .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string()),
            remote_timeout_secs,
            log_level: non_empty("ZONEKEEPER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate settings every command depends on
    pub fn validate(&self) -> Result<()> {
        match self.state_store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "ZONEKEEPER_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.state_store_type
            ),
        }

        if let Some(secs) = self.remote_timeout_secs
            && !(MIN_REMOTE_TIMEOUT_SECS..=MAX_REMOTE_TIMEOUT_SECS).contains(&secs)
        {
            anyhow::bail!(
                "ZONEKEEPER_REMOTE_TIMEOUT_SECS must be between {} and {} seconds. Got: {}",
                MIN_REMOTE_TIMEOUT_SECS,
                MAX_REMOTE_TIMEOUT_SECS,
                secs
            );
        }

        self.level()?;
        Ok(())
    }

    /// Tracing level from `ZONEKEEPER_LOG_LEVEL`
    pub fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "ZONEKEEPER_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    fn store(&self, path: &str) -> StoreConfig {
        match self.state_store_type.as_str() {
            "memory" => StoreConfig::Memory,
            _ => StoreConfig::File {
                path: path.to_string(),
            },
        }
    }

    /// Where accounts are kept
    pub fn accounts_store(&self) -> StoreConfig {
        self.store(&self.accounts_path)
    }

    /// Where site settings are kept
    pub fn settings_store(&self) -> StoreConfig {
        self.store(&self.settings_path)
    }

    /// Full configuration for commands that talk to the remote zone
    pub fn zonekeeper_config(&self) -> Result<ZonekeeperConfig> {
        let Some(base_domain) = self.base_domain.clone() else {
            anyhow::bail!(
                "ZONEKEEPER_BASE_DOMAIN is required. \
                Set it via: export ZONEKEEPER_BASE_DOMAIN=example.com"
            );
        };

        let provider = match self.provider_type.as_str() {
            "cloudflare" => ProviderConfig::Cloudflare {
                api_token: self.provider_api_token.clone().ok_or_else(|| {
                    anyhow::anyhow!(
                        "ZONEKEEPER_PROVIDER_API_TOKEN is required. \
                        Set it via: export ZONEKEEPER_PROVIDER_API_TOKEN=your_token"
                    )
                })?,
                zone_id: self.provider_zone_id.clone().ok_or_else(|| {
                    anyhow::anyhow!("ZONEKEEPER_PROVIDER_ZONE_ID is required")
                })?,
            },
            other => anyhow::bail!(
                "ZONEKEEPER_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: cloudflare",
                other
            ),
        };

        let mut manager = ManagerConfig::new(base_domain);
        if let Some(secs) = self.remote_timeout_secs {
            manager = manager.with_remote_timeout_secs(secs);
        }

        let record_store = match self.state_store_type.as_str() {
            "memory" => RecordStoreConfig::Memory,
            _ => RecordStoreConfig::File {
                path: self.state_store_path.clone(),
            },
        };

        let config = ZonekeeperConfig {
            manager,
            provider,
            record_store,
            accounts: self.accounts_store(),
            settings: self.settings_store(),
        };
        config.validate()?;
        Ok(config)
    }
}
