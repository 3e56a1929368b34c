//! Contract Test: Delete
//!
//! Constraints verified:
//! - A record missing remotely counts as deleted and is removed locally
//! - A second delete reports a clean NotFound
//! - Other remote failures keep the local row so the delete can be retried
//! - A local removal failure after remote success is reported
//! - Suspended owners can still delete their records
//!
//! If this test fails, deletes can strand records on one side.

mod common;

use common::*;
use zonekeeper_core::traits::{AccountDirectory, AccountStatus, RemoteError};
use zonekeeper_core::{ManagerError, ManagerEvent, Plan};

#[tokio::test]
async fn delete_removes_both_sides() {
    let mut h = Harness::new();
    let owner = h.owner("alice@example.com", Plan::Free).await;
    let record = h
        .manager
        .create(&owner, a_record("www", "203.0.113.5"))
        .await
        .unwrap();
    h.drain_events();

    let deleted = h.manager.delete(&record.id, &owner).await.unwrap();
    assert_eq!(deleted.id, record.id);
    assert_eq!(h.remote.len(), 0);
    assert!(h.manager.list(&owner).await.unwrap().is_empty());
    assert_eq!(
        h.drain_events(),
        vec![ManagerEvent::Deleted {
            record_id: record.id,
            owner_id: owner,
            full_name: "www.example.com".into(),
            remote_already_absent: false,
        }]
    );
}

#[tokio::test]
async fn delete_is_idempotent_when_remote_is_already_gone() {
    let mut h = Harness::new();
    let owner = h.owner("alice@example.com", Plan::Free).await;
    let record = h
        .manager
        .create(&owner, a_record("www", "203.0.113.5"))
        .await
        .unwrap();
    h.drain_events();

    // Someone removed the record in the provider dashboard
    h.remote.forget(record.remote_id.as_deref().unwrap());

    h.manager
        .delete(&record.id, &owner)
        .await
        .expect("remote not-found counts as deleted");
    assert!(h.manager.list(&owner).await.unwrap().is_empty());
    assert!(h.drain_events().iter().any(|e| matches!(
        e,
        ManagerEvent::Deleted {
            remote_already_absent: true,
            ..
        }
    )));

    let err = h.manager.delete(&record.id, &owner).await.unwrap_err();
    assert_eq!(
        err,
        ManagerError::NotFound {
            record_id: record.id.clone()
        }
    );
    assert_eq!(h.remote.delete_call_count(), 1, "second delete never reached the remote");
}

#[tokio::test]
async fn remote_failure_keeps_the_local_row() {
    let h = Harness::new();
    let owner = h.owner("alice@example.com", Plan::Free).await;
    let record = h
        .manager
        .create(&owner, a_record("www", "203.0.113.5"))
        .await
        .unwrap();
    h.remote
        .fail_deletes_with(Some(RemoteError::authorization("token lacks DNS edit")));

    let err = h.manager.delete(&record.id, &owner).await.unwrap_err();
    assert!(matches!(err, ManagerError::RemoteDeleteFailed(_)));
    assert!(!err.is_retryable());
    assert_eq!(h.manager.list(&owner).await.unwrap(), vec![record.clone()]);

    // Retrying after the remote recovers finishes the job
    h.remote.fail_deletes_with(None);
    h.manager.delete(&record.id, &owner).await.unwrap();
    assert_eq!(h.remote.len(), 0);
}

#[tokio::test]
async fn local_removal_failure_is_reported() {
    let mut h = Harness::new();
    let owner = h.owner("alice@example.com", Plan::Free).await;
    let record = h
        .manager
        .create(&owner, a_record("www", "203.0.113.5"))
        .await
        .unwrap();
    h.store.fail_removes(true);

    let err = h.manager.delete(&record.id, &owner).await.unwrap_err();
    assert!(matches!(
        err,
        ManagerError::ReconciliationInconsistency { ref full_name, .. } if full_name == "www.example.com"
    ));
    assert!(h
        .drain_events()
        .iter()
        .any(|e| matches!(e, ManagerEvent::Inconsistency { .. })));

    // The remote is already gone, so a retry converges through the not-found path
    h.store.fail_removes(false);
    h.manager.delete(&record.id, &owner).await.unwrap();
    assert!(h.manager.list(&owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn suspended_owner_can_delete() {
    let h = Harness::new();
    let owner = h.owner("alice@example.com", Plan::Free).await;
    let record = h
        .manager
        .create(&owner, a_record("www", "203.0.113.5"))
        .await
        .unwrap();
    h.accounts
        .set_status(&owner, AccountStatus::Suspended)
        .await
        .unwrap();

    h.manager.delete(&record.id, &owner).await.unwrap();
    assert_eq!(h.remote.len(), 0);
}

#[tokio::test]
async fn no_orphans_after_mixed_failures() {
    let h = Harness::new();
    let owner = h.owner("alice@example.com", Plan::Pro).await;

    for i in 0..10 {
        match i % 4 {
            0 => h.remote.fail_creates_with(Some(RemoteError::transient("flaky"))),
            1 => h.store.fail_commits(true),
            _ => {}
        }
        let _ = h
            .manager
            .create(&owner, a_record(&format!("host{}", i), "203.0.113.5"))
            .await;
        h.remote.fail_creates_with(None);
        h.store.fail_commits(false);
        h.assert_no_orphans().await;
    }

    for record in h.manager.list(&owner).await.unwrap() {
        if record.subdomain_label.ends_with('2') {
            h.remote.fail_deletes_with(Some(RemoteError::transient("flaky")));
        }
        let _ = h.manager.delete(&record.id, &owner).await;
        h.remote.fail_deletes_with(None);
        h.assert_no_orphans().await;
    }

    // Every local record is backed remotely and every remote record is known locally
    let mut local: Vec<String> = h
        .manager
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.full_name)
        .collect();
    local.sort();
    assert_eq!(h.remote.names(), local);
    assert_eq!(local, ["host2.example.com"]);
}
