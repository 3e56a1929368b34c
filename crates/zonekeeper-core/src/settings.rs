//! Site settings
//!
//! A small versioned configuration record (contact details shown to users)
//! that administrators edit. Updates carry the version they were based on
//! and are rejected when someone else changed the settings in between.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::Error;
use crate::state::json_file;

/// Contact details shown to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub telegram_id: Option<String>,
    pub telegram_url: Option<String>,
    pub contact_message_en: Option<String>,
    pub contact_message_fa: Option<String>,
    /// Incremented on every successful update
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            telegram_id: None,
            telegram_url: None,
            contact_message_en: None,
            contact_message_fa: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Fields to change; `None` leaves a field as is, `Some("")` clears it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub telegram_id: Option<String>,
    pub telegram_url: Option<String>,
    pub contact_message_en: Option<String>,
    pub contact_message_fa: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.telegram_id.is_none()
            && self.telegram_url.is_none()
            && self.contact_message_en.is_none()
            && self.contact_message_fa.is_none()
    }

    fn validate(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::invalid_input("no settings supplied"));
        }
        if let Some(url) = self.telegram_url.as_deref().map(str::trim) {
            if !url.is_empty() && !url.starts_with("https://") {
                return Err(Error::invalid_input("telegram_url must start with https://"));
            }
        }
        Ok(())
    }

    /// Produce the next settings version
    fn apply(&self, current: &SiteSettings) -> SiteSettings {
        fn merge(field: &Option<String>, current: &Option<String>) -> Option<String> {
            match field.as_deref().map(str::trim) {
                Some("") => None,
                Some(value) => Some(value.to_string()),
                None => current.clone(),
            }
        }

        SiteSettings {
            telegram_id: merge(&self.telegram_id, &current.telegram_id),
            telegram_url: merge(&self.telegram_url, &current.telegram_url),
            contact_message_en: merge(&self.contact_message_en, &current.contact_message_en),
            contact_message_fa: merge(&self.contact_message_fa, &current.contact_message_fa),
            version: current.version + 1,
            updated_at: Utc::now(),
        }
    }
}

/// Storage for [`SiteSettings`]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current settings (defaults if never written)
    async fn get(&self) -> Result<SiteSettings, Error>;

    /// Apply `patch` if the stored version still equals `expected_version`
    ///
    /// # Returns
    ///
    /// - `Ok(SiteSettings)`: The new settings
    /// - `Err(Error::Conflict)`: The settings changed since `expected_version`
    /// - `Err(Error::InvalidInput)`: Empty patch or malformed URL
    async fn update(&self, expected_version: u64, patch: &SettingsPatch)
    -> Result<SiteSettings, Error>;
}

fn check_version(current: &SiteSettings, expected_version: u64) -> Result<(), Error> {
    if current.version != expected_version {
        return Err(Error::conflict(format!(
            "settings changed (expected version {}, found {})",
            expected_version, current.version
        )));
    }
    Ok(())
}

/// In-memory settings store
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<RwLock<SiteSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self) -> Result<SiteSettings, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn update(&self, expected_version: u64, patch: &SettingsPatch) -> Result<SiteSettings, Error> {
        patch.validate()?;
        let mut guard = self.inner.write().await;
        check_version(&guard, expected_version)?;
        *guard = patch.apply(&guard);
        Ok(guard.clone())
    }
}

/// JSON-file settings store
///
/// Reads and version checks always see the file as it is on disk, under the
/// same lock other processes take before writing it.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    local: Mutex<()>,
}

impl FileSettingsStore {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        json_file::ensure_parent_dir(&path).await?;
        Ok(Self {
            path,
            local: Mutex::new(()),
        })
    }

    async fn load(&self) -> Result<SiteSettings, Error> {
        Ok(json_file::load_with_recovery::<SiteSettings>(&self.path)
            .await
            .map_err(|e| Error::settings_store(e.to_string()))?
            .map(|loaded| loaded.doc)
            .unwrap_or_default())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self) -> Result<SiteSettings, Error> {
        let _local = self.local.lock().await;
        let _file = json_file::lock_exclusive(&self.path).await?;
        self.load().await
    }

    async fn update(&self, expected_version: u64, patch: &SettingsPatch) -> Result<SiteSettings, Error> {
        patch.validate()?;
        let _local = self.local.lock().await;
        let _file = json_file::lock_exclusive(&self.path).await?;
        let current = self.load().await?;
        check_version(&current, expected_version)?;

        let next = patch.apply(&current);
        json_file::write_atomic(&self.path, &next)
            .await
            .map_err(|e| Error::settings_store(e.to_string()))?;
        tracing::info!("Site settings updated to version {}", next.version);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn telegram(id: &str) -> SettingsPatch {
        SettingsPatch {
            telegram_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = MemorySettingsStore::new();
        assert_eq!(store.get().await.unwrap().version, 0);

        let updated = store.update(0, &telegram("@support")).await.unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.telegram_id.as_deref(), Some("@support"));

        // Clearing a field with an empty string
        let cleared = store.update(1, &telegram("")).await.unwrap();
        assert_eq!(cleared.telegram_id, None);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = MemorySettingsStore::new();
        store.update(0, &telegram("@first")).await.unwrap();

        let err = store.update(0, &telegram("@second")).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            store.get().await.unwrap().telegram_id.as_deref(),
            Some("@first")
        );
    }

    #[tokio::test]
    async fn test_patch_validation() {
        let store = MemorySettingsStore::new();
        assert!(store.update(0, &SettingsPatch::default()).await.is_err());

        let insecure = SettingsPatch {
            telegram_url: Some("http://t.me/support".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update(0, &insecure).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_file_settings_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = FileSettingsStore::new(&path).await.unwrap();
        let patch = SettingsPatch {
            telegram_url: Some("https://t.me/support".into()),
            contact_message_en: Some("Write to us".into()),
            ..Default::default()
        };
        store.update(0, &patch).await.unwrap();

        let reloaded = FileSettingsStore::new(&path).await.unwrap();
        let settings = reloaded.get().await.unwrap();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.telegram_url.as_deref(), Some("https://t.me/support"));
        assert_eq!(settings.contact_message_fa, None);
    }

    #[tokio::test]
    async fn test_file_settings_version_check_spans_stores() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let first = FileSettingsStore::new(&path).await.unwrap();
        let second = FileSettingsStore::new(&path).await.unwrap();

        first.update(0, &telegram("support")).await.unwrap();
        let err = second.update(0, &telegram("sales")).await.unwrap_err();
        assert!(err.is_conflict());

        let current = second.get().await.unwrap();
        assert_eq!(current.version, 1);
        assert_eq!(current.telegram_id.as_deref(), Some("support"));
        second.update(current.version, &telegram("sales")).await.unwrap();
        assert_eq!(first.get().await.unwrap().version, 2);
    }
}
