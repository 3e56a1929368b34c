// # File Account Directory
//
// JSON-file implementation of AccountDirectory. Every call reloads the file
// under the same lock, atomic replace and backup recovery as the record
// store, so email uniqueness holds across processes sharing the file.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "accounts": {
//     "acct-1": {
//       "id": "acct-1",
//       "email": "alice@example.com",
//       "name": "Alice",
//       "plan": "free",
//       "role": "user",
//       "status": "active",
//       "created_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{AccountMap, register_into, set_plan_in, set_status_in, sorted};
use crate::Error;
use crate::plan::Plan;
use crate::state::json_file;
use crate::traits::account_directory::{Account, AccountDirectory, AccountStatus, Role};

const ACCOUNT_FILE_VERSION: &str = "1.0";

/// File-backed account directory
#[derive(Debug)]
pub struct FileAccountDirectory {
    path: PathBuf,
    local: Mutex<()>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct AccountFileFormat {
    version: String,
    accounts: AccountMap,
}

impl FileAccountDirectory {
    /// Create or load an account directory at `path`
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        json_file::ensure_parent_dir(&path).await?;

        let directory = Self {
            path,
            local: Mutex::new(()),
        };
        let count = directory.read(|accounts| accounts.len()).await?;
        tracing::debug!("Loaded {} accounts from {}", count, directory.path.display());
        Ok(directory)
    }

    async fn load(&self) -> Result<AccountMap, Error> {
        let loaded = json_file::load_with_recovery::<AccountFileFormat>(&self.path)
            .await
            .map_err(|e| Error::account_store(e.to_string()))?;
        Ok(match loaded {
            Some(loaded) => {
                if loaded.doc.version != ACCOUNT_FILE_VERSION {
                    tracing::warn!(
                        "Account file version mismatch: expected {}, got {}. \
                        Attempting to load anyway.",
                        ACCOUNT_FILE_VERSION,
                        loaded.doc.version
                    );
                }
                loaded.doc.accounts
            }
            None => AccountMap::new(),
        })
    }

    async fn read<T>(&self, read: impl FnOnce(&AccountMap) -> T) -> Result<T, Error> {
        let _local = self.local.lock().await;
        let _file = json_file::lock_exclusive(&self.path).await?;
        let accounts = self.load().await?;
        Ok(read(&accounts))
    }

    async fn write_through<T>(
        &self,
        mutate: impl FnOnce(&mut AccountMap) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let _local = self.local.lock().await;
        let _file = json_file::lock_exclusive(&self.path).await?;
        let mut accounts = self.load().await?;
        let out = mutate(&mut accounts)?;

        let file = AccountFileFormat {
            version: ACCOUNT_FILE_VERSION.to_string(),
            accounts,
        };
        json_file::write_atomic(&self.path, &file)
            .await
            .map_err(|e| Error::account_store(e.to_string()))?;
        Ok(out)
    }
}

#[async_trait]
impl AccountDirectory for FileAccountDirectory {
    async fn get_account(&self, account_id: &str) -> Result<Option<Account>, Error> {
        self.read(|accounts| accounts.get(account_id).cloned()).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, Error> {
        self.read(sorted).await
    }

    async fn register(&self, email: &str, name: &str, role: Role) -> Result<Account, Error> {
        self.write_through(|accounts| register_into(accounts, email, name, role))
            .await
    }

    async fn set_plan(&self, account_id: &str, plan: Plan) -> Result<Account, Error> {
        self.write_through(|accounts| set_plan_in(accounts, account_id, plan))
            .await
    }

    async fn set_status(&self, account_id: &str, status: AccountStatus) -> Result<Account, Error> {
        self.write_through(|accounts| set_status_in(accounts, account_id, status))
            .await
    }
}
