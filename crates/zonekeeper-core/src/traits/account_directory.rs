// # Account Directory Trait
//
// Defines the interface to account state: who exists, whether they are
// active, which plan they are on and therefore how many records they may hold.
//
// ## Implementations
//
// - Memory: `accounts::MemoryAccountDirectory`
// - File-based: `accounts::FileAccountDirectory`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::Plan;

/// Owner status as seen by the record manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerStatus {
    Active,
    Suspended,
    NotFound,
}

/// Stored account status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

/// Account role; admins may list every record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Lowercased, unique across the directory
    pub email: String,
    pub name: String,
    pub plan: Plan,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new active account on the default plan
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            name: name.into(),
            plan: Plan::default(),
            role,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Trait for account directory implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
/// `register` must be atomic with respect to the email uniqueness check.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Get an account by id
    async fn get_account(&self, account_id: &str) -> Result<Option<Account>, crate::Error>;

    /// List all accounts, oldest first
    async fn list_accounts(&self) -> Result<Vec<Account>, crate::Error>;

    /// Register a new account
    ///
    /// # Returns
    ///
    /// - `Ok(Account)`: The new account (Free plan, Active)
    /// - `Err(Error::InvalidInput)`: Malformed email or name
    /// - `Err(Error::Conflict)`: The email is already registered
    async fn register(&self, email: &str, name: &str, role: Role)
    -> Result<Account, crate::Error>;

    /// Move an account to another plan
    ///
    /// Existing records are never touched; see `RecordManager::change_plan`.
    async fn set_plan(&self, account_id: &str, plan: Plan) -> Result<Account, crate::Error>;

    /// Suspend or reactivate an account
    async fn set_status(
        &self,
        account_id: &str,
        status: AccountStatus,
    ) -> Result<Account, crate::Error>;

    /// Resolve the status the record manager acts on
    async fn owner_status(&self, owner_id: &str) -> Result<OwnerStatus, crate::Error> {
        Ok(match self.get_account(owner_id).await? {
            Some(account) => match account.status {
                AccountStatus::Active => OwnerStatus::Active,
                AccountStatus::Suspended => OwnerStatus::Suspended,
            },
            None => OwnerStatus::NotFound,
        })
    }

    /// Record limit of the owner's current plan, `None` for unknown owners
    async fn record_limit(&self, owner_id: &str) -> Result<Option<u32>, crate::Error> {
        Ok(self
            .get_account(owner_id)
            .await?
            .map(|account| account.plan.record_limit()))
    }
}

/// Validate registration input and return the normalized email and name
pub fn normalize_registration(email: &str, name: &str) -> Result<(String, String), crate::Error> {
    let email = email.trim().to_ascii_lowercase();
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(|c| c.is_whitespace() || c.is_control())
        }
        None => false,
    };
    if !valid_email {
        return Err(crate::Error::invalid_input(format!(
            "'{}' is not a valid email address",
            email
        )));
    }

    let name = name.trim().to_string();
    if name.chars().count() < 2 {
        return Err(crate::Error::invalid_input(
            "name must be at least 2 characters long",
        ));
    }

    Ok((email, name))
}
