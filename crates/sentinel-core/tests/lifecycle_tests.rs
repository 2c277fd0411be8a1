//! Integration tests for the device lifecycle and the ledger hash chain.

use async_trait::async_trait;
use sentinel_core::{
    ArchiveStore, DeviceRegistry, DeviceStatus, LedgerRecord, MemoryArchiveStore, SentinelError,
    TransactionKind,
};
use std::collections::HashSet;
use std::sync::Arc;

fn registry() -> DeviceRegistry {
    DeviceRegistry::new(Arc::new(MemoryArchiveStore::new()))
}

struct UnreachableStore;

#[async_trait]
impl ArchiveStore for UnreachableStore {
    async fn export(&self, _batch: &[LedgerRecord]) -> sentinel_core::Result<String> {
        Err(SentinelError::ExternalStoreFailure("connection refused".to_string()))
    }
}

fn assert_chain_linked(records: &[LedgerRecord]) {
    for pair in records.windows(2) {
        assert_eq!(
            pair[1].previous_record_hash, pair[0].record_hash,
            "record {} does not link to {}",
            pair[1].index, pair[0].index
        );
    }
}

// =============================================================================
// Identity rotation
// =============================================================================

#[test]
fn test_retired_keys_never_live_again() {
    let mut reg = registry();
    let names = ["sensor1", "sensor2", "sensor3", "server", "actuators"];

    let mut keys: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            reg.register(*name, format!("10.0.0.{}", i + 1))
                .unwrap()
                .device
                .identity_key
        })
        .collect();

    // Several rounds of compromise and recovery on every device
    for round in 0..4 {
        for key in keys.iter_mut() {
            reg.mark_compromised(key, &format!("attack-{round}")).unwrap();
            *key = reg.recover(key).unwrap().device.identity_key;
        }
    }

    let retired: HashSet<String> = reg
        .ledger()
        .records()
        .iter()
        .flat_map(|r| r.transactions.iter())
        .filter(|tx| tx.kind == TransactionKind::Recover)
        .filter_map(|tx| tx.identity_key_before.clone())
        .collect();

    assert_eq!(retired.len(), names.len() * 4);
    for device in reg.list() {
        assert!(!retired.contains(&device.identity_key));
        assert_eq!(device.status, DeviceStatus::Active);
    }
    assert_eq!(reg.len(), names.len());
}

#[test]
fn test_recover_unknown_key_changes_nothing() {
    let mut reg = registry();
    reg.register("thermo1", "10.0.0.5").unwrap();
    let ledger_before = reg.ledger().records().to_vec();
    let devices_before = reg.list();

    let err = reg.recover("unknown-key").unwrap_err();

    assert!(matches!(err, SentinelError::DeviceNotFound(_)));
    assert_eq!(reg.ledger().records(), ledger_before.as_slice());
    assert_eq!(reg.list(), devices_before);
}

// =============================================================================
// Hash chain
// =============================================================================

#[test]
fn test_chain_links_through_full_lifecycle() {
    let mut reg = registry();
    let k1 = reg.register("thermo1", "10.0.0.5").unwrap().device.identity_key;
    reg.register("sensor2", "10.0.0.3").unwrap();
    reg.mark_compromised(&k1, "spoofing").unwrap();
    reg.recover(&k1).unwrap();

    let records = reg.ledger().records();
    assert_eq!(records.len(), 6);
    assert!(records[0].is_genesis());
    assert_chain_linked(records);
    assert!(reg.verify_ledger().is_ok());
}

#[tokio::test]
async fn test_chain_verifies_after_archival() {
    let mut reg = registry();
    let key = reg.register("thermo1", "10.0.0.5").unwrap().device.identity_key;
    reg.mark_compromised(&key, "spoofing").unwrap();

    let archive = reg.archive().await.unwrap().unwrap();
    assert_eq!(archive.record_type(), Some(TransactionKind::Archive));

    // genesis, register, isolate, archive
    assert_eq!(reg.ledger().len(), 4);
    assert!(reg.verify_ledger().is_ok());
    assert!(reg.archive().await.unwrap().is_none());
}

// =============================================================================
// Removal policy
// =============================================================================

#[tokio::test]
async fn test_remove_emits_remove_then_recover() {
    let mut reg = registry();
    let key = reg.register("thermo1", "10.0.0.5").unwrap().device.identity_key;

    let outcome = reg.remove(&key).await.unwrap();

    // Nothing matched the sweep, so no archive record
    assert!(outcome.archive_record.is_none());
    let kinds: Vec<_> = reg
        .ledger()
        .records()
        .iter()
        .filter_map(|r| r.record_type())
        .collect();
    assert_eq!(
        kinds,
        vec![
            TransactionKind::Register,
            TransactionKind::Remove,
            TransactionKind::Recover
        ]
    );
    assert_eq!(
        outcome.removal_record.transactions[0].status,
        Some(DeviceStatus::Removed)
    );
    assert_eq!(reg.get(&outcome.device.identity_key).unwrap().status, DeviceStatus::Active);
    assert!(reg.is_retired(&key));
}

#[tokio::test]
async fn test_second_remove_sweeps_first_removal() {
    let mut reg = registry();
    let key = reg.register("thermo1", "10.0.0.5").unwrap().device.identity_key;

    let first = reg.remove(&key).await.unwrap();
    let second = reg.remove(&first.device.identity_key).await.unwrap();

    let archived = second.archive_record.unwrap();
    let summary = archived.transactions[0].archive.clone().unwrap();
    assert_eq!(summary.archived_hashes, vec![first.removal_record.record_hash]);
    assert!(reg.verify_ledger().is_ok());
}

#[tokio::test]
async fn test_remove_rolls_back_when_export_fails() {
    let mut reg = DeviceRegistry::new(Arc::new(UnreachableStore));
    let key = reg.register("thermo1", "10.0.0.5").unwrap().device.identity_key;
    reg.mark_compromised(&key, "spoofing").unwrap();
    let ledger_before = reg.ledger().records().to_vec();
    let devices_before = reg.list();

    let err = reg.remove(&key).await.unwrap_err();

    assert!(matches!(err, SentinelError::ExternalStoreFailure(_)));
    assert_eq!(reg.ledger().records(), ledger_before.as_slice());
    assert_eq!(reg.list(), devices_before);
    assert_eq!(reg.get(&key).unwrap().status, DeviceStatus::Isolated);
}

#[tokio::test]
async fn test_archive_rolls_back_when_export_fails() {
    let mut reg = DeviceRegistry::new(Arc::new(UnreachableStore));
    let key = reg.register("thermo1", "10.0.0.5").unwrap().device.identity_key;
    reg.mark_compromised(&key, "spoofing").unwrap();
    let before = reg.ledger().records().to_vec();

    assert!(reg.archive().await.is_err());
    assert_eq!(reg.ledger().records(), before.as_slice());
    assert!(reg.ledger().halted().is_none());
}
