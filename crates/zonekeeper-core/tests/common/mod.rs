//! Test doubles and common utilities for lifecycle contract tests
//!
//! This module provides a scriptable remote zone and a record store with
//! failure injection, plus a harness that wires them into a RecordManager.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use zonekeeper_core::error::Error;
use zonekeeper_core::traits::{
    AccountDirectory, RecordChanges, RecordSpec, RecordStore, RemoteError, RemoteZone, Role,
};
use zonekeeper_core::{
    CreateRecord, DnsRecord, ManagerConfig, ManagerEvent, MemoryAccountDirectory,
    MemoryRecordStore, Plan, RecordManager, RecordType, Ttl,
};

pub const BASE_DOMAIN: &str = "example.com";

/// A remote zone held in memory whose failures and latency are scripted
///
/// Like a real provider, it refuses a second record with the same name.
#[derive(Default)]
pub struct ScriptedRemoteZone {
    records: Mutex<HashMap<String, RecordSpec>>,
    next_id: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_create: Mutex<Option<RemoteError>>,
    fail_update: Mutex<Option<RemoteError>>,
    fail_delete: Mutex<Option<RemoteError>>,
    delay: Mutex<Duration>,
}

impl ScriptedRemoteZone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every create fail with `err` until cleared
    pub fn fail_creates_with(&self, err: Option<RemoteError>) {
        *self.fail_create.lock().unwrap() = err;
    }

    pub fn fail_updates_with(&self, err: Option<RemoteError>) {
        *self.fail_update.lock().unwrap() = err;
    }

    pub fn fail_deletes_with(&self, err: Option<RemoteError>) {
        *self.fail_delete.lock().unwrap() = err;
    }

    /// Delay every call by `delay`
    pub fn respond_after(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Remove a record behind the manager's back
    pub fn forget(&self, remote_id: &str) {
        self.records.lock().unwrap().remove(remote_id);
    }

    pub fn get(&self, remote_id: &str) -> Option<RecordSpec> {
        self.records.lock().unwrap().get(remote_id).cloned()
    }

    pub fn holds(&self, remote_id: &str) -> bool {
        self.records.lock().unwrap().contains_key(remote_id)
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .lock()
            .unwrap()
            .values()
            .map(|spec| spec.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteZone for ScriptedRemoteZone {
    async fn create_record(&self, spec: &RecordSpec) -> Result<String, RemoteError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(err) = self.fail_create.lock().unwrap().clone() {
            return Err(err);
        }

        let mut records = self.records.lock().unwrap();
        if records.values().any(|existing| existing.name == spec.name) {
            return Err(RemoteError::validation(format!(
                "a record named {} already exists",
                spec.name
            )));
        }
        let remote_id = format!("remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        records.insert(remote_id.clone(), spec.clone());
        Ok(remote_id)
    }

    async fn update_record(
        &self,
        remote_id: &str,
        changes: &RecordChanges,
    ) -> Result<(), RemoteError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(err) = self.fail_update.lock().unwrap().clone() {
            return Err(err);
        }

        let mut records = self.records.lock().unwrap();
        let spec = records
            .get_mut(remote_id)
            .ok_or_else(|| RemoteError::not_found(format!("record {}", remote_id)))?;
        if let Some(content) = &changes.content {
            spec.content = content.clone();
        }
        if let Some(ttl) = changes.ttl {
            spec.ttl = ttl;
        }
        if let Some(proxied) = changes.proxied {
            spec.proxied = proxied;
        }
        Ok(())
    }

    async fn delete_record(&self, remote_id: &str) -> Result<(), RemoteError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(err) = self.fail_delete.lock().unwrap().clone() {
            return Err(err);
        }

        match self.records.lock().unwrap().remove(remote_id) {
            Some(_) => Ok(()),
            None => Err(RemoteError::not_found(format!("record {}", remote_id))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A memory record store whose writes can be made to fail
#[derive(Default)]
pub struct FlakyRecordStore {
    inner: MemoryRecordStore,
    fail_commit: AtomicBool,
    fail_replace: AtomicBool,
    fail_remove: AtomicBool,
    fail_release: AtomicBool,
}

impl FlakyRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_replaces(&self, fail: bool) {
        self.fail_replace.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub fn fail_releases(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }

    /// Rows including reservations
    pub async fn row_count(&self) -> usize {
        self.inner.len().await
    }

    fn injected(flag: &AtomicBool, what: &str) -> Result<(), Error> {
        if flag.load(Ordering::SeqCst) {
            return Err(Error::record_store(format!("injected {} failure", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn reserve(&self, reservation: &DnsRecord) -> Result<(), Error> {
        self.inner.reserve(reservation).await
    }

    async fn commit(&self, id: &str, remote_id: &str) -> Result<DnsRecord, Error> {
        Self::injected(&self.fail_commit, "commit")?;
        self.inner.commit(id, remote_id).await
    }

    async fn release(&self, id: &str) -> Result<(), Error> {
        Self::injected(&self.fail_release, "release")?;
        self.inner.release(id).await
    }

    async fn get(&self, id: &str) -> Result<Option<DnsRecord>, Error> {
        self.inner.get(id).await
    }

    async fn find_by_name(&self, full_name: &str) -> Result<Option<DnsRecord>, Error> {
        self.inner.find_by_name(full_name).await
    }

    async fn replace(&self, record: &DnsRecord) -> Result<(), Error> {
        Self::injected(&self.fail_replace, "replace")?;
        self.inner.replace(record).await
    }

    async fn remove(&self, id: &str) -> Result<Option<DnsRecord>, Error> {
        Self::injected(&self.fail_remove, "remove")?;
        self.inner.remove(id).await
    }

    async fn count_committed(&self, owner_id: &str) -> Result<usize, Error> {
        self.inner.count_committed(owner_id).await
    }

    async fn count_held(&self, owner_id: &str) -> Result<usize, Error> {
        self.inner.count_held(owner_id).await
    }

    async fn list_committed(&self, owner_id: Option<&str>) -> Result<Vec<DnsRecord>, Error> {
        self.inner.list_committed(owner_id).await
    }

    async fn flush(&self) -> Result<(), Error> {
        self.inner.flush().await
    }
}

/// A RecordManager wired to test doubles
pub struct Harness {
    pub manager: RecordManager,
    pub events: mpsc::Receiver<ManagerEvent>,
    pub remote: Arc<ScriptedRemoteZone>,
    pub store: Arc<FlakyRecordStore>,
    pub accounts: Arc<MemoryAccountDirectory>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::new(BASE_DOMAIN))
    }

    pub fn with_remote_timeout(secs: u64) -> Self {
        Self::with_config(ManagerConfig::new(BASE_DOMAIN).with_remote_timeout_secs(secs))
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        let remote = Arc::new(ScriptedRemoteZone::new());
        let store = Arc::new(FlakyRecordStore::new());
        let accounts = Arc::new(MemoryAccountDirectory::new());

        let (manager, events) = RecordManager::new(
            remote.clone(),
            store.clone(),
            accounts.clone(),
            config,
        )
        .expect("manager construction succeeds");

        Self {
            manager,
            events,
            remote,
            store,
            accounts,
        }
    }

    /// Register an active owner on `plan` and return their id
    pub async fn owner(&self, email: &str, plan: Plan) -> String {
        let account = self
            .accounts
            .register(email, "Test Owner", Role::User)
            .await
            .expect("registration succeeds");
        self.accounts
            .set_plan(&account.id, plan)
            .await
            .expect("plan change succeeds");
        account.id
    }

    /// Every event emitted so far
    pub fn drain_events(&mut self) -> Vec<ManagerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Assert that every committed local record is held by the remote zone
    pub async fn assert_no_orphans(&self) {
        for record in self.manager.list_all().await.unwrap() {
            let remote_id = record.remote_id.as_deref().expect("listed records are committed");
            assert!(
                self.remote.holds(remote_id),
                "local record {} points at missing remote record {}",
                record.full_name,
                remote_id
            );
        }
    }
}

pub fn a_record(label: &str, ip: &str) -> CreateRecord {
    CreateRecord {
        subdomain_label: label.to_string(),
        record_type: RecordType::A,
        content: ip.to_string(),
        ttl: Ttl::Auto,
        proxied: false,
    }
}

pub fn cname_record(label: &str, target: &str) -> CreateRecord {
    CreateRecord {
        subdomain_label: label.to_string(),
        record_type: RecordType::Cname,
        content: target.to_string(),
        ttl: Ttl::Auto,
        proxied: false,
    }
}
