//! DNS record lifecycle manager
//!
//! The RecordManager is responsible for:
//! - Enforcing per-owner quota and zone-wide name uniqueness
//! - Keeping the local record store and the remote zone in agreement
//! - Compensating (or reporting) when one side fails after the other succeeded
//!
//! ## Architecture
//!
//! ```text
//!                      ┌────────────────┐
//!   create/update ───▶ │ RecordManager  │ ───▶ ManagerEvent (operators)
//!   delete/list        └────────────────┘
//!                               │
//!         ┌─────────────────────┼─────────────────────┐
//!         │                     │                     │
//!         ▼                     ▼                     ▼
//! ┌──────────────────┐  ┌──────────────┐    ┌──────────────┐
//! │ AccountDirectory │  │ RecordStore  │    │  RemoteZone  │
//! │ (status, plan)   │  │ (reserve,    │    │  (create,    │
//! │                  │  │  commit)     │    │   update...) │
//! └──────────────────┘  └──────────────┘    └──────────────┘
//! ```
//!
//! ## Create Flow
//!
//! 1. Validate input and owner status
//! 2. Under the owner lock: check quota, then reserve `full_name`; recount
//!    the names the owner holds and back out if another process won the race
//! 3. Create the remote record (bounded by the remote timeout)
//! 4. Commit the reservation with the remote id, or release it on failure
//! 5. If the commit fails, delete the remote record again; if that fails
//!    too, report `ReconciliationInconsistency`
//!
//! ## Cancellation
//!
//! Mutating operations run in a spawned task. Dropping the returned future
//! does not abandon a remote call that is already in flight: the task still
//! commits or compensates, and the locks are held until it does.

mod error;
mod locks;

pub use error::ManagerError;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ManagerConfig;
use crate::plan::{Plan, Quota};
use crate::record::{DnsRecord, RecordType, Ttl};
use crate::traits::{
    AccountDirectory, OwnerStatus, RecordChanges, RecordSpec, RecordStore, RemoteError,
    RemoteZone,
};
use crate::validate::{self, ValidationError};
use locks::KeyedLocks;

/// Result type for manager operations
pub type ManagerResult<T> = std::result::Result<T, ManagerError>;

/// Request to create a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRecord {
    pub subdomain_label: String,
    pub record_type: RecordType,
    pub content: String,
    #[serde(default)]
    pub ttl: Ttl,
    #[serde(default)]
    pub proxied: bool,
}

/// Request to change an existing record; at least one field must be set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub content: Option<String>,
    pub ttl: Option<Ttl>,
    pub proxied: Option<bool>,
}

/// Events emitted by the RecordManager
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ManagerEvent {
    /// A record now exists locally and remotely
    Created {
        record_id: String,
        owner_id: String,
        full_name: String,
    },

    /// A record was changed on both sides
    Updated {
        record_id: String,
        owner_id: String,
        full_name: String,
    },

    /// A record was removed from both sides
    Deleted {
        record_id: String,
        owner_id: String,
        full_name: String,
        /// The remote zone no longer had the record
        remote_already_absent: bool,
    },

    /// A request was refused for a reason the caller can correct
    Rejected {
        operation: String,
        owner_id: String,
        reason: String,
    },

    /// An owner tried to touch a record that belongs to someone else
    OwnershipViolation {
        record_id: String,
        owner_id: String,
        actual_owner_id: String,
    },

    /// Local and remote state diverged; needs operator attention
    Inconsistency {
        full_name: String,
        remote_id: String,
        detail: String,
    },

    /// A plan change left an owner with more records than the new limit
    OverQuotaAfterPlanChange {
        owner_id: String,
        plan: Option<Plan>,
        current_count: usize,
        max_allowed: u32,
    },
}

/// DNS record lifecycle manager
///
/// Cheap to clone; clones share locks, stores and the event channel.
///
/// ## Threading
///
/// All operations may be called concurrently. Creates for the same owner
/// are serialized so the quota check and the commit cannot interleave;
/// updates and deletes are serialized per record.
#[derive(Clone)]
pub struct RecordManager {
    inner: Arc<Inner>,
}

struct Inner {
    remote: Arc<dyn RemoteZone>,
    store: Arc<dyn RecordStore>,
    accounts: Arc<dyn AccountDirectory>,
    base_domain: String,
    remote_timeout: Duration,
    owner_locks: KeyedLocks,
    record_locks: KeyedLocks,
    event_tx: mpsc::Sender<ManagerEvent>,
}

impl std::fmt::Debug for RecordManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordManager")
            .field("provider", &self.inner.remote.provider_name())
            .field("base_domain", &self.inner.base_domain)
            .field("remote_timeout", &self.inner.remote_timeout)
            .finish_non_exhaustive()
    }
}

impl RecordManager {
    /// Create a new record manager
    ///
    /// # Returns
    ///
    /// A tuple of (manager, event_receiver) where event_receiver yields
    /// manager events. Events are dropped with a warning when the channel
    /// is full.
    pub fn new(
        remote: Arc<dyn RemoteZone>,
        store: Arc<dyn RecordStore>,
        accounts: Arc<dyn AccountDirectory>,
        config: ManagerConfig,
    ) -> crate::Result<(Self, mpsc::Receiver<ManagerEvent>)> {
        config.validate()?;
        let base_domain = validate::normalize_hostname(&config.base_domain)
            .map_err(|e| crate::Error::config(format!("invalid base_domain: {}", e)))?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let manager = Self {
            inner: Arc::new(Inner {
                remote,
                store,
                accounts,
                base_domain,
                remote_timeout: Duration::from_secs(config.remote_timeout_secs),
                owner_locks: KeyedLocks::default(),
                record_locks: KeyedLocks::default(),
                event_tx: tx,
            }),
        };

        Ok((manager, rx))
    }

    /// Normalized base domain records are created under
    pub fn base_domain(&self) -> &str {
        &self.inner.base_domain
    }

    /// Create a record for `owner_id`
    pub async fn create(&self, owner_id: &str, request: CreateRecord) -> ManagerResult<DnsRecord> {
        let inner = Arc::clone(&self.inner);
        let owner_id = owner_id.to_string();
        detached(async move {
            let result = inner.create(&owner_id, request).await;
            inner.note_rejection("create", &owner_id, &result);
            result
        })
        .await
    }

    /// Change content, TTL or proxy flag of a record owned by `owner_id`
    pub async fn update(
        &self,
        record_id: &str,
        owner_id: &str,
        request: UpdateRecord,
    ) -> ManagerResult<DnsRecord> {
        let inner = Arc::clone(&self.inner);
        let record_id = record_id.to_string();
        let owner_id = owner_id.to_string();
        detached(async move {
            let result = inner.update(&record_id, &owner_id, request).await;
            inner.note_rejection("update", &owner_id, &result);
            result
        })
        .await
    }

    /// Delete a record owned by `owner_id` and return what was removed
    ///
    /// A record already missing remotely is still removed locally.
    pub async fn delete(&self, record_id: &str, owner_id: &str) -> ManagerResult<DnsRecord> {
        let inner = Arc::clone(&self.inner);
        let record_id = record_id.to_string();
        let owner_id = owner_id.to_string();
        detached(async move {
            let result = inner.delete(&record_id, &owner_id).await;
            inner.note_rejection("delete", &owner_id, &result);
            result
        })
        .await
    }

    /// Committed records of `owner_id`, oldest first
    pub async fn list(&self, owner_id: &str) -> ManagerResult<Vec<DnsRecord>> {
        Ok(self.inner.store.list_committed(Some(owner_id)).await?)
    }

    /// Every committed record, oldest first
    ///
    /// Callers must restrict this to administrators.
    pub async fn list_all(&self) -> ManagerResult<Vec<DnsRecord>> {
        Ok(self.inner.store.list_committed(None).await?)
    }

    /// Record usage of `owner_id` against their plan limit
    pub async fn quota(&self, owner_id: &str) -> ManagerResult<Quota> {
        self.inner.quota(owner_id).await
    }

    /// Re-evaluate quota after the owner's plan changed
    ///
    /// Existing records are never deleted. An owner above the new limit is
    /// reported and cannot create records until the count drops below it.
    pub async fn on_plan_changed(&self, owner_id: &str) -> ManagerResult<Quota> {
        self.inner.on_plan_changed(owner_id).await
    }

    /// Move `owner_id` to `plan` and re-evaluate their quota
    pub async fn change_plan(&self, owner_id: &str, plan: Plan) -> ManagerResult<Quota> {
        let _owner = self.inner.owner_locks.lock(owner_id).await;
        match self.inner.accounts.set_plan(owner_id, plan).await {
            Ok(account) => info!("Owner {} moved to plan {}", account.id, account.plan),
            Err(crate::Error::NotFound(_)) => {
                return Err(ManagerError::UnknownOwner {
                    owner_id: owner_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
        self.inner.on_plan_changed(owner_id).await
    }
}

/// Run an operation to completion even if the caller stops waiting
async fn detached<T, F>(operation: F) -> ManagerResult<T>
where
    T: Send + 'static,
    F: Future<Output = ManagerResult<T>> + Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| ManagerError::Internal(format!("operation task failed: {}", e)))?
}

impl Inner {
    async fn create(&self, owner_id: &str, request: CreateRecord) -> ManagerResult<DnsRecord> {
        self.require_active_owner(owner_id).await?;

        let label = validate::normalize_label(&request.subdomain_label)?;
        let full_name = validate::full_name(&label, &self.base_domain)?;
        let content = validate::normalize_content(request.record_type, &request.content)?;
        let ttl = validate::check_ttl(request.ttl)?;
        if request.record_type == RecordType::Cname && content == full_name {
            return Err(ValidationError::SelfReferentialCname(full_name).into());
        }

        let _owner = self.owner_locks.lock(owner_id).await;

        let quota = self.quota(owner_id).await?;
        if quota.is_exhausted() {
            return Err(ManagerError::QuotaExceeded {
                current: quota.current_count,
                limit: quota.max_allowed,
            });
        }

        let reservation = DnsRecord::reservation(
            owner_id,
            label,
            full_name.clone(),
            request.record_type,
            content,
            ttl,
            request.proxied,
        );
        match self.store.reserve(&reservation).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => return Err(ManagerError::NameConflict { full_name }),
            Err(e) => return Err(e.into()),
        }
        debug!("Reserved {} for owner {}", full_name, owner_id);

        // The owner lock is per process; another process sharing the store
        // may have reserved against the same quota in the meantime
        let held = match self.store.count_held(owner_id).await {
            Ok(held) => held,
            Err(e) => {
                self.release(&reservation).await;
                return Err(e.into());
            }
        };
        if held > quota.max_allowed as usize {
            warn!(
                "Owner {} holds {} names against a limit of {}; releasing {}",
                owner_id, held, quota.max_allowed, full_name
            );
            self.release(&reservation).await;
            return Err(ManagerError::QuotaExceeded {
                current: held - 1,
                limit: quota.max_allowed,
            });
        }

        let spec = RecordSpec::from(&reservation);
        let remote_id = match self.remote_call(self.remote.create_record(&spec)).await {
            Ok(remote_id) => remote_id,
            Err(err) => {
                warn!("Remote create of {} failed: {}", full_name, err);
                self.release(&reservation).await;
                return Err(ManagerError::RemoteCreateFailed(err));
            }
        };

        match self.store.commit(&reservation.id, &remote_id).await {
            Ok(record) => {
                info!(
                    "Created {} {} -> {} (owner {}, remote id {})",
                    record.record_type, record.full_name, record.content, owner_id, remote_id
                );
                self.emit_event(ManagerEvent::Created {
                    record_id: record.id.clone(),
                    owner_id: record.owner_id.clone(),
                    full_name: record.full_name.clone(),
                });
                Ok(record)
            }
            Err(commit_err) => {
                self.compensate_create(&reservation, &remote_id, commit_err)
                    .await
            }
        }
    }

    /// Undo a remote create whose local commit failed
    async fn compensate_create(
        &self,
        reservation: &DnsRecord,
        remote_id: &str,
        commit_err: crate::Error,
    ) -> ManagerResult<DnsRecord> {
        error!(
            "Failed to commit {} after remote create: {}. Deleting remote record {}",
            reservation.full_name, commit_err, remote_id
        );

        let outcome = match self.remote_call(self.remote.delete_record(remote_id)).await {
            Ok(()) => Err(ManagerError::from(commit_err)),
            Err(err) if err.is_not_found() => Err(ManagerError::from(commit_err)),
            Err(err) => Err(self.inconsistency(
                &reservation.full_name,
                remote_id,
                format!(
                    "local commit failed ({}) and compensating remote delete failed ({})",
                    commit_err, err
                ),
            )),
        };

        self.release(reservation).await;
        outcome
    }

    async fn update(
        &self,
        record_id: &str,
        owner_id: &str,
        request: UpdateRecord,
    ) -> ManagerResult<DnsRecord> {
        let _record = self.record_locks.lock(record_id).await;

        let record = self.owned_record(record_id, owner_id).await?;
        self.require_active_owner(owner_id).await?;
        let changes = normalize_changes(&record, request)?;
        let remote_id = committed_remote_id(&record)?;

        if let Err(err) = self
            .remote_call(self.remote.update_record(&remote_id, &changes))
            .await
        {
            warn!("Remote update of {} failed: {}", record.full_name, err);
            return Err(ManagerError::RemoteUpdateFailed(err));
        }

        let mut updated = record.clone();
        changes.apply_to(&mut updated);
        updated.updated_at = chrono::Utc::now();

        if let Err(e) = self.store.replace(&updated).await {
            return Err(self.inconsistency(
                &record.full_name,
                &remote_id,
                format!("remote record updated but local write failed ({})", e),
            ));
        }

        info!(
            "Updated {} -> {} (ttl {}, proxied {})",
            updated.full_name, updated.content, updated.ttl, updated.proxied
        );
        self.emit_event(ManagerEvent::Updated {
            record_id: updated.id.clone(),
            owner_id: updated.owner_id.clone(),
            full_name: updated.full_name.clone(),
        });
        Ok(updated)
    }

    async fn delete(&self, record_id: &str, owner_id: &str) -> ManagerResult<DnsRecord> {
        let _record = self.record_locks.lock(record_id).await;

        let record = self.owned_record(record_id, owner_id).await?;
        let remote_id = committed_remote_id(&record)?;

        let remote_already_absent =
            match self.remote_call(self.remote.delete_record(&remote_id)).await {
                Ok(()) => false,
                Err(err) if err.is_not_found() => {
                    info!(
                        "Remote record {} for {} was already gone",
                        remote_id, record.full_name
                    );
                    true
                }
                Err(err) => {
                    warn!("Remote delete of {} failed: {}", record.full_name, err);
                    return Err(ManagerError::RemoteDeleteFailed(err));
                }
            };

        if let Err(e) = self.store.remove(record_id).await {
            return Err(self.inconsistency(
                &record.full_name,
                &remote_id,
                format!("remote record deleted but local removal failed ({})", e),
            ));
        }

        info!("Deleted {} (owner {})", record.full_name, record.owner_id);
        self.emit_event(ManagerEvent::Deleted {
            record_id: record.id.clone(),
            owner_id: record.owner_id.clone(),
            full_name: record.full_name.clone(),
            remote_already_absent,
        });
        Ok(record)
    }

    async fn quota(&self, owner_id: &str) -> ManagerResult<Quota> {
        let max_allowed = self
            .accounts
            .record_limit(owner_id)
            .await?
            .ok_or_else(|| ManagerError::UnknownOwner {
                owner_id: owner_id.to_string(),
            })?;
        let current_count = self.store.count_committed(owner_id).await?;
        Ok(Quota {
            current_count,
            max_allowed,
        })
    }

    async fn on_plan_changed(&self, owner_id: &str) -> ManagerResult<Quota> {
        let quota = self.quota(owner_id).await?;
        if quota.is_over_limit() {
            let plan = self
                .accounts
                .get_account(owner_id)
                .await?
                .map(|account| account.plan);
            warn!(
                "Owner {} holds {} records but the plan allows {}; existing records are kept",
                owner_id, quota.current_count, quota.max_allowed
            );
            self.emit_event(ManagerEvent::OverQuotaAfterPlanChange {
                owner_id: owner_id.to_string(),
                plan,
                current_count: quota.current_count,
                max_allowed: quota.max_allowed,
            });
        }
        Ok(quota)
    }

    async fn require_active_owner(&self, owner_id: &str) -> ManagerResult<()> {
        match self.accounts.owner_status(owner_id).await? {
            OwnerStatus::Active => Ok(()),
            OwnerStatus::Suspended => Err(ManagerError::OwnerSuspended {
                owner_id: owner_id.to_string(),
            }),
            OwnerStatus::NotFound => Err(ManagerError::UnknownOwner {
                owner_id: owner_id.to_string(),
            }),
        }
    }

    /// Load a committed record and check that `owner_id` holds it
    async fn owned_record(&self, record_id: &str, owner_id: &str) -> ManagerResult<DnsRecord> {
        let record = self
            .store
            .get(record_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound {
                record_id: record_id.to_string(),
            })?;

        if record.owner_id != owner_id {
            warn!(
                "Ownership violation: {} tried to modify record {} ({}) owned by {}",
                owner_id, record_id, record.full_name, record.owner_id
            );
            self.emit_event(ManagerEvent::OwnershipViolation {
                record_id: record_id.to_string(),
                owner_id: owner_id.to_string(),
                actual_owner_id: record.owner_id.clone(),
            });
            return Err(ManagerError::OwnershipViolation {
                record_id: record_id.to_string(),
                owner_id: owner_id.to_string(),
            });
        }

        Ok(record)
    }

    /// Bound a remote call by the configured timeout
    async fn remote_call<T>(
        &self,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::transient(format!(
                "{} did not respond within {}s",
                self.remote.provider_name(),
                self.remote_timeout.as_secs()
            ))),
        }
    }

    /// Free a reservation; failures only leave the name blocked, so they are logged
    async fn release(&self, reservation: &DnsRecord) {
        if let Err(e) = self.store.release(&reservation.id).await {
            warn!(
                "Failed to release reservation for {}: {}",
                reservation.full_name, e
            );
        }
    }

    fn inconsistency(&self, full_name: &str, remote_id: &str, detail: String) -> ManagerError {
        error!(
            "Local and remote state diverged for {} (remote id {}): {}",
            full_name, remote_id, detail
        );
        self.emit_event(ManagerEvent::Inconsistency {
            full_name: full_name.to_string(),
            remote_id: remote_id.to_string(),
            detail: detail.clone(),
        });
        ManagerError::ReconciliationInconsistency {
            full_name: full_name.to_string(),
            remote_id: remote_id.to_string(),
            detail,
        }
    }

    fn note_rejection<T>(&self, operation: &str, owner_id: &str, result: &ManagerResult<T>) {
        let Err(err) = result else { return };
        if matches!(err, ManagerError::OwnershipViolation { .. }) || !err.is_user_correctable() {
            return;
        }
        debug!("Rejected {} for owner {}: {}", operation, owner_id, err);
        self.emit_event(ManagerEvent::Rejected {
            operation: operation.to_string(),
            owner_id: owner_id.to_string(),
            reason: err.to_string(),
        });
    }

    fn emit_event(&self, event: ManagerEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Validate an update request against the record it applies to
fn normalize_changes(record: &DnsRecord, request: UpdateRecord) -> ManagerResult<RecordChanges> {
    let content = request
        .content
        .map(|content| validate::normalize_content(record.record_type, &content))
        .transpose()?;
    if record.record_type == RecordType::Cname && content.as_deref() == Some(record.full_name.as_str()) {
        return Err(ValidationError::SelfReferentialCname(record.full_name.clone()).into());
    }
    let ttl = request.ttl.map(validate::check_ttl).transpose()?;

    let changes = RecordChanges {
        content,
        ttl,
        proxied: request.proxied,
    };
    if changes.is_empty() {
        return Err(ValidationError::NoChanges.into());
    }
    Ok(changes)
}

fn committed_remote_id(record: &DnsRecord) -> ManagerResult<String> {
    record.remote_id.clone().ok_or_else(|| {
        ManagerError::Internal(format!("record {} has no remote id", record.id))
    })
}
