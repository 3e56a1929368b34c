//! Command execution
//!
//! Each command opens only the stores it needs, runs one operation and
//! returns its result as JSON. Commands that touch records go through the
//! RecordManager; nothing here enforces quota, uniqueness or ownership.

use anyhow::Result;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};
use zonekeeper_core::traits::{AccountDirectory, AccountStatus, RecordStore, RemoteZone, Role};
use zonekeeper_core::{
    CreateRecord, FileAccountDirectory, FileSettingsStore, ManagerEvent, MemoryAccountDirectory,
    MemorySettingsStore, Plan, ProviderRegistry, RecordManager, SettingsPatch, SettingsStore,
    StoreConfig, UpdateRecord,
};

use crate::cli::{AccountCommand, Caller, Command, RecordCommand, SettingsCommand};
use crate::config::Config;

/// Configuration problem found while preparing a command
#[derive(Debug)]
pub struct ConfigError(String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Refusal the caller can fix (bad arguments, missing rights)
#[derive(Debug)]
pub struct Rejected(String);

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Rejected {}

/// Run a command and return its JSON output
pub async fn run(command: Command, config: &Config) -> Result<Value> {
    match command {
        Command::Plans => Ok(plans()),
        Command::Account(command) => account(command, config).await,
        Command::Record(command) => record(command, config).await,
        Command::Quota(caller) => {
            let session = Session::open(config).await?;
            let quota = session.manager.quota(&caller.account).await;
            let output = quota.map(|quota| {
                json!({
                    "owner_id": caller.account,
                    "current_count": quota.current_count,
                    "max_allowed": quota.max_allowed,
                    "remaining": quota.remaining(),
                    "over_limit": quota.is_over_limit(),
                })
            });
            session.close().await;
            Ok(output?)
        }
        Command::Settings(command) => settings(command, config).await,
    }
}

fn plans() -> Value {
    let plans: Vec<Value> = Plan::all()
        .into_iter()
        .map(|plan| {
            json!({
                "id": plan.as_str(),
                "name": plan.display_name(),
                "price": plan.price(),
                "record_limit": plan.record_limit(),
            })
        })
        .collect();
    json!({ "plans": plans })
}

async fn account(command: AccountCommand, config: &Config) -> Result<Value> {
    match command {
        AccountCommand::Register { email, name, admin } => {
            let accounts = open_accounts(&config.accounts_store()).await?;
            let role = if admin { Role::Admin } else { Role::User };
            let account = accounts.register(&email, &name, role).await?;
            info!("Registered account {} ({})", account.id, account.email);
            Ok(serde_json::to_value(account)?)
        }
        AccountCommand::List => {
            let accounts = open_accounts(&config.accounts_store()).await?;
            Ok(serde_json::to_value(accounts.list_accounts().await?)?)
        }
        AccountCommand::Plan { account_id, plan } => {
            // Plan changes re-evaluate quota against the owner's records
            let session = Session::open(config).await?;
            let quota = session.manager.change_plan(&account_id, plan).await;
            session.close().await;
            let quota = quota?;
            Ok(json!({
                "account_id": account_id,
                "plan": plan,
                "current_count": quota.current_count,
                "max_allowed": quota.max_allowed,
                "over_limit": quota.is_over_limit(),
            }))
        }
        AccountCommand::Suspend { account_id } => {
            set_status(config, &account_id, AccountStatus::Suspended).await
        }
        AccountCommand::Activate { account_id } => {
            set_status(config, &account_id, AccountStatus::Active).await
        }
    }
}

async fn set_status(config: &Config, account_id: &str, status: AccountStatus) -> Result<Value> {
    let accounts = open_accounts(&config.accounts_store()).await?;
    let account = accounts.set_status(account_id, status).await?;
    info!("Account {} is now {:?}", account.id, account.status);
    Ok(serde_json::to_value(account)?)
}

async fn record(command: RecordCommand, config: &Config) -> Result<Value> {
    let session = Session::open(config).await?;
    let output = record_in(&session, command).await;
    session.close().await;
    output
}

async fn record_in(session: &Session, command: RecordCommand) -> Result<Value> {
    let manager = &session.manager;
    match command {
        RecordCommand::Create {
            caller,
            label,
            record_type,
            content,
            ttl,
            proxied,
        } => {
            let request = CreateRecord {
                subdomain_label: label,
                record_type: record_type.into(),
                content,
                ttl,
                proxied,
            };
            let record = manager.create(&caller.account, request).await?;
            Ok(serde_json::to_value(record)?)
        }
        RecordCommand::Update {
            caller,
            record_id,
            content,
            ttl,
            proxied,
        } => {
            let request = UpdateRecord {
                content,
                ttl,
                proxied,
            };
            let record = manager.update(&record_id, &caller.account, request).await?;
            Ok(serde_json::to_value(record)?)
        }
        RecordCommand::Delete { caller, record_id } => {
            let record = manager.delete(&record_id, &caller.account).await?;
            Ok(json!({ "deleted": record }))
        }
        RecordCommand::List(caller) => {
            Ok(serde_json::to_value(manager.list(&caller.account).await?)?)
        }
        RecordCommand::ListAll(caller) => {
            require_admin(session.accounts.as_ref(), &caller).await?;
            Ok(serde_json::to_value(manager.list_all().await?)?)
        }
    }
}

async fn require_admin(accounts: &dyn AccountDirectory, caller: &Caller) -> Result<()> {
    match accounts.get_account(&caller.account).await? {
        Some(account) if account.is_admin() => Ok(()),
        _ => {
            warn!("Account {} requested all records without admin rights", caller.account);
            Err(Rejected(format!(
                "account {} is not an administrator",
                caller.account
            ))
            .into())
        }
    }
}

async fn settings(command: SettingsCommand, config: &Config) -> Result<Value> {
    let store = open_settings(&config.settings_store()).await?;
    match command {
        SettingsCommand::Show => Ok(serde_json::to_value(store.get().await?)?),
        SettingsCommand::Set {
            version,
            telegram_id,
            telegram_url,
            contact_message_en,
            contact_message_fa,
        } => {
            let patch = SettingsPatch {
                telegram_id,
                telegram_url,
                contact_message_en,
                contact_message_fa,
            };
            let updated = store.update(version, &patch).await?;
            info!("Site settings updated to version {}", updated.version);
            Ok(serde_json::to_value(updated)?)
        }
    }
}

/// A RecordManager wired from configuration, plus its event drain
struct Session {
    manager: RecordManager,
    accounts: Arc<dyn AccountDirectory>,
    store: Arc<dyn RecordStore>,
    events: JoinHandle<()>,
}

impl Session {
    async fn open(config: &Config) -> Result<Self> {
        let full = config
            .zonekeeper_config()
            .map_err(|e| ConfigError(format!("{:#}", e)))?;

        let registry = ProviderRegistry::new();
        #[cfg(feature = "cloudflare")]
        zonekeeper_provider_cloudflare::register(&registry);

        let remote: Arc<dyn RemoteZone> = Arc::from(
            registry
                .create_remote_zone(&full.provider)
                .map_err(|e| ConfigError(e.to_string()))?,
        );
        let store: Arc<dyn RecordStore> =
            Arc::from(registry.create_record_store(&full.record_store).await?);
        let accounts = open_accounts(&full.accounts).await?;

        let (manager, events) = RecordManager::new(
            Arc::clone(&remote),
            Arc::clone(&store),
            Arc::clone(&accounts),
            full.manager,
        )
        .map_err(|e| ConfigError(e.to_string()))?;

        info!(
            "Managing records under {} via {}",
            manager.base_domain(),
            remote.provider_name()
        );

        Ok(Self {
            manager,
            accounts,
            store,
            events: drain_events(events),
        })
    }

    /// Flush the record store and wait until every event has been logged
    async fn close(self) {
        let Self {
            manager,
            store,
            events,
            ..
        } = self;
        drop(manager);

        if let Err(e) = store.flush().await {
            error!("Failed to flush record store: {}", e);
        }
        if let Err(e) = events.await {
            error!("Event drain task failed: {}", e);
        }
    }
}

/// Log manager events until the manager is dropped
fn drain_events(events: mpsc::Receiver<ManagerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = ReceiverStream::new(events);
        while let Some(event) = stream.next().await {
            log_event(&event);
        }
    })
}

fn log_event(event: &ManagerEvent) {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| format!("{:?}", event));
    match event {
        ManagerEvent::Inconsistency { .. } => error!("event: {}", payload),
        ManagerEvent::OwnershipViolation { .. } | ManagerEvent::OverQuotaAfterPlanChange { .. } => {
            warn!("event: {}", payload)
        }
        _ => info!("event: {}", payload),
    }
}

async fn open_accounts(config: &StoreConfig) -> Result<Arc<dyn AccountDirectory>> {
    Ok(match config {
        StoreConfig::File { path } => Arc::new(FileAccountDirectory::new(path).await?),
        StoreConfig::Memory => Arc::new(MemoryAccountDirectory::new()),
    })
}

async fn open_settings(config: &StoreConfig) -> Result<Arc<dyn SettingsStore>> {
    Ok(match config {
        StoreConfig::File { path } => Arc::new(FileSettingsStore::new(path).await?),
        StoreConfig::Memory => Arc::new(MemorySettingsStore::new()),
    })
}
