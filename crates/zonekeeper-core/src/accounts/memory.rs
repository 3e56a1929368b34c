// # Memory Account Directory
//
// In-memory implementation of AccountDirectory for tests and ephemeral runs.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AccountMap, register_into, set_plan_in, set_status_in, sorted};
use crate::Error;
use crate::plan::Plan;
use crate::traits::account_directory::{Account, AccountDirectory, AccountStatus, Role};

/// In-memory account directory
///
/// Clones share the same accounts.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountDirectory {
    inner: Arc<RwLock<AccountMap>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account as-is (fixtures and imports)
    pub async fn insert(&self, account: Account) {
        self.inner
            .write()
            .await
            .insert(account.id.clone(), account);
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn get_account(&self, account_id: &str) -> Result<Option<Account>, Error> {
        Ok(self.inner.read().await.get(account_id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, Error> {
        Ok(sorted(&*self.inner.read().await))
    }

    async fn register(&self, email: &str, name: &str, role: Role) -> Result<Account, Error> {
        register_into(&mut *self.inner.write().await, email, name, role)
    }

    async fn set_plan(&self, account_id: &str, plan: Plan) -> Result<Account, Error> {
        set_plan_in(&mut *self.inner.write().await, account_id, plan)
    }

    async fn set_status(&self, account_id: &str, status: AccountStatus) -> Result<Account, Error> {
        set_status_in(&mut *self.inner.write().await, account_id, status)
    }
}
