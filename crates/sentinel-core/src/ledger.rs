//! Ledger Store: append-only hash chain of lifecycle records
//!
//! Every record seals a batch of transactions with
//! `record_hash = blake3(previous_record_hash || canonical(transactions))`.
//! The chain is rooted at a genesis record whose previous hash is `"0"`.
//! Archival is the only operation that takes records out of the live
//! sequence, and it always leaves behind an `archive` record listing the
//! hashes it removed so the chain stays checkable.

use crate::archive::ArchiveStore;
use crate::data_model::{
    ArchiveSummary, ArchivedLink, DeviceStatus, LedgerRecord, Transaction, TransactionKind,
};
use crate::error::{Result, SentinelError};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::{error, info};

pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_SEED: &str = "genesis";

/// Records selected for archival but not yet removed from the live ledger
#[derive(Debug, Clone)]
pub struct StagedArchive {
    pub batch: Vec<LedgerRecord>,
    tail_hash: String,
}

#[derive(Debug, Clone)]
pub struct LedgerStore {
    records: Vec<LedgerRecord>,
    next_index: u64,
    halted: Option<String>,
}

impl LedgerStore {
    /// Create a ledger holding only the genesis record
    pub fn new() -> Self {
        Self {
            records: vec![Self::genesis()],
            next_index: 1,
            halted: None,
        }
    }

    /// The well-known root record
    pub fn genesis() -> LedgerRecord {
        LedgerRecord {
            index: 0,
            timestamp: Utc::now(),
            transactions: Vec::new(),
            previous_record_hash: GENESIS_PREVIOUS_HASH.to_string(),
            record_hash: blake3::hash(GENESIS_SEED.as_bytes()).to_hex().to_string(),
        }
    }

    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn tail(&self) -> Option<&LedgerRecord> {
        self.records.last()
    }

    pub fn tail_hash(&self) -> &str {
        self.records
            .last()
            .map(|r| r.record_hash.as_str())
            .unwrap_or(GENESIS_PREVIOUS_HASH)
    }

    /// Reason the ledger stopped accepting writes, if it did
    pub fn halted(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    /// Fail fast when a previous integrity check found corruption
    pub fn ensure_writable(&self) -> Result<()> {
        match &self.halted {
            Some(reason) => Err(SentinelError::LedgerIntegrityViolation(format!(
                "ledger halted: {reason}"
            ))),
            None => Ok(()),
        }
    }

    /// Seal a batch of transactions onto the tail of the chain
    pub fn append(&mut self, transactions: Vec<Transaction>) -> Result<LedgerRecord> {
        self.ensure_writable()?;
        if transactions.is_empty() {
            return Err(SentinelError::InvalidArgument(
                "cannot append an empty transaction batch".to_string(),
            ));
        }

        let previous_record_hash = self.tail_hash().to_string();
        let record_hash = compute_record_hash(&previous_record_hash, &transactions)?;
        let record = LedgerRecord {
            index: self.next_index,
            timestamp: Utc::now(),
            transactions,
            previous_record_hash,
            record_hash,
        };

        self.next_index += 1;
        self.records.push(record.clone());
        Ok(record)
    }

    /// Accept a record sealed elsewhere. It must extend the current tail
    /// and its hash must recompute; anything else is a reorder or an edit
    /// and halts the ledger.
    pub fn append_sealed(&mut self, record: LedgerRecord) -> Result<()> {
        self.ensure_writable()?;

        if record.previous_record_hash != self.tail_hash() {
            let reason = format!(
                "record {} does not extend tail {}",
                record.record_hash,
                self.tail_hash()
            );
            return Err(self.halt(reason));
        }
        let expected = compute_record_hash(&record.previous_record_hash, &record.transactions)?;
        if expected != record.record_hash {
            let reason = format!("record {} hash does not match its payload", record.index);
            return Err(self.halt(reason));
        }

        self.next_index = self.next_index.max(record.index + 1);
        self.records.push(record);
        Ok(())
    }

    /// Select the records an archival sweep would remove.
    /// Genesis and earlier archive records are never selected.
    pub fn stage_archive<F>(&self, predicate: F) -> Option<StagedArchive>
    where
        F: Fn(&LedgerRecord) -> bool,
    {
        let batch: Vec<LedgerRecord> = self
            .records
            .iter()
            .filter(|r| !r.is_genesis() && !r.has_kind(TransactionKind::Archive))
            .filter(|r| predicate(r))
            .cloned()
            .collect();

        if batch.is_empty() {
            return None;
        }

        Some(StagedArchive {
            batch,
            tail_hash: self.tail_hash().to_string(),
        })
    }

    /// Remove a staged batch and seal the summary record referencing `handle`
    pub fn commit_archive(&mut self, staged: StagedArchive, handle: String) -> Result<LedgerRecord> {
        self.ensure_writable()?;
        if staged.tail_hash != self.tail_hash() {
            return Err(SentinelError::InvalidArgument(
                "archive staging is stale, ledger moved since it was prepared".to_string(),
            ));
        }

        let archived_hashes: Vec<String> =
            staged.batch.iter().map(|r| r.record_hash.clone()).collect();
        let archived_links: Vec<ArchivedLink> = staged
            .batch
            .iter()
            .map(|r| ArchivedLink {
                record_hash: r.record_hash.clone(),
                previous_record_hash: r.previous_record_hash.clone(),
            })
            .collect();
        let removed: HashSet<&str> = archived_hashes.iter().map(String::as_str).collect();
        self.records
            .retain(|r| !removed.contains(r.record_hash.as_str()));

        let summary = ArchiveSummary {
            handle,
            archived_count: archived_hashes.len(),
            archived_hashes,
            archived_links,
        };
        self.append(vec![Transaction::archive(summary)])
    }

    /// Full archival sweep against an external store. All-or-nothing: if the
    /// export fails the live ledger is left untouched.
    pub async fn archive<F>(
        &mut self,
        predicate: F,
        store: &dyn ArchiveStore,
    ) -> Result<Option<LedgerRecord>>
    where
        F: Fn(&LedgerRecord) -> bool,
    {
        self.ensure_writable()?;
        let Some(staged) = self.stage_archive(predicate) else {
            info!("No ledger records to archive");
            return Ok(None);
        };

        let handle = store.export(&staged.batch).await?;
        let count = staged.batch.len();
        let record = self.commit_archive(staged, handle.clone())?;
        info!(archived = count, handle = %handle, "Archived ledger records");
        Ok(Some(record))
    }

    /// Recompute every hash and link. Any mismatch halts the ledger.
    pub fn verify(&mut self) -> Result<()> {
        match check_chain(&self.records) {
            Ok(()) => Ok(()),
            Err(reason) => Err(self.halt(reason)),
        }
    }

    fn halt(&mut self, reason: String) -> SentinelError {
        error!(reason = %reason, "Ledger integrity violation, halting writes");
        self.halted = Some(reason.clone());
        SentinelError::LedgerIntegrityViolation(reason)
    }

    #[cfg(test)]
    pub(crate) fn records_mut(&mut self) -> &mut Vec<LedgerRecord> {
        &mut self.records
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Records swept by the default archival policy: anything that captured a
/// compromised device, plus every removal.
pub fn default_archive_predicate(record: &LedgerRecord) -> bool {
    record.has_status(DeviceStatus::Compromised) || record.has_kind(TransactionKind::Remove)
}

pub fn compute_record_hash(previous_record_hash: &str, transactions: &[Transaction]) -> Result<String> {
    let payload = serde_json::to_vec(transactions)
        .map_err(|e| SentinelError::InvalidArgument(format!("unserializable transactions: {e}")))?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(previous_record_hash.as_bytes());
    hasher.update(&payload);
    Ok(hasher.finalize().to_hex().to_string())
}

fn check_chain(records: &[LedgerRecord]) -> std::result::Result<(), String> {
    let Some(root) = records.first() else {
        return Err("ledger has no genesis record".to_string());
    };
    let genesis_hash = blake3::hash(GENESIS_SEED.as_bytes()).to_hex().to_string();
    if !root.is_genesis() || root.record_hash != genesis_hash {
        return Err("first record is not the genesis record".to_string());
    }

    // archived record hash -> the hash it linked to
    let archived: HashMap<&str, &str> = records
        .iter()
        .flat_map(|r| r.transactions.iter())
        .filter_map(|tx| tx.archive.as_ref())
        .flat_map(|s| s.archived_links.iter())
        .map(|l| (l.record_hash.as_str(), l.previous_record_hash.as_str()))
        .collect();

    for pair in records.windows(2) {
        let (prev, record) = (&pair[0], &pair[1]);

        let recomputed = compute_record_hash(&record.previous_record_hash, &record.transactions)
            .map_err(|e| e.to_string())?;
        if recomputed != record.record_hash {
            return Err(format!("record {} was modified after sealing", record.index));
        }

        if !links_back(&archived, &record.previous_record_hash, &prev.record_hash) {
            return Err(format!(
                "record {} does not link to record {}",
                record.index, prev.index
            ));
        }
    }
    Ok(())
}

/// Follow archived links from `from` until `target` is reached. Only
/// archived records may sit between two adjacent live records.
fn links_back<'a>(archived: &HashMap<&'a str, &'a str>, from: &'a str, target: &str) -> bool {
    let mut cursor = from;
    for _ in 0..=archived.len() {
        if cursor == target {
            return true;
        }
        match archived.get(cursor) {
            Some(&previous) => cursor = previous,
            None => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchiveStore;
    use crate::data_model::Device;

    fn device(status: DeviceStatus) -> Device {
        Device {
            name: "sensor1".to_string(),
            network_address: "10.0.0.2".to_string(),
            identity_key: "k1".to_string(),
            status,
            model: None,
        }
    }

    fn tx(kind: TransactionKind, status: DeviceStatus) -> Transaction {
        Transaction::for_device(kind, &device(status), 10)
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl ArchiveStore for FailingStore {
        async fn export(&self, _batch: &[LedgerRecord]) -> Result<String> {
            Err(SentinelError::ExternalStoreFailure("unreachable".to_string()))
        }
    }

    #[test]
    fn test_genesis() {
        let ledger = LedgerStore::new();
        let root = &ledger.records()[0];

        assert_eq!(ledger.len(), 1);
        assert_eq!(root.previous_record_hash, "0");
        assert_eq!(
            root.record_hash,
            blake3::hash(b"genesis").to_hex().to_string()
        );
        assert!(root.record_type().is_none());
    }

    #[test]
    fn test_append_links_to_tail() {
        let mut ledger = LedgerStore::new();
        let a = ledger
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();
        let b = ledger
            .append(vec![tx(TransactionKind::Isolate, DeviceStatus::Isolated)])
            .unwrap();

        assert_eq!(a.previous_record_hash, ledger.records()[0].record_hash);
        assert_eq!(b.previous_record_hash, a.record_hash);
        assert_eq!(b.index, 2);
        for pair in ledger.records().windows(2) {
            assert_eq!(pair[1].previous_record_hash, pair[0].record_hash);
        }
        assert!(ledger.verify().is_ok());
    }

    #[test]
    fn test_empty_batch_rejected() {
        let mut ledger = LedgerStore::new();
        let err = ledger.append(vec![]).unwrap_err();
        assert!(matches!(err, SentinelError::InvalidArgument(_)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_tampering_detected_and_halts_writes() {
        let mut ledger = LedgerStore::new();
        ledger
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();
        ledger
            .append(vec![tx(TransactionKind::Remove, DeviceStatus::Removed)])
            .unwrap();

        ledger.records_mut()[1].transactions[0].device_name = Some("evil".to_string());

        let err = ledger.verify().unwrap_err();
        assert!(matches!(err, SentinelError::LedgerIntegrityViolation(_)));
        assert!(ledger.halted().is_some());

        let err = ledger
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap_err();
        assert!(matches!(err, SentinelError::LedgerIntegrityViolation(_)));
    }

    #[test]
    fn test_relinking_detected() {
        let mut ledger = LedgerStore::new();
        ledger
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();
        ledger
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();

        // Dropping a record without an archive summary breaks the chain
        ledger.records_mut().remove(1);
        assert!(ledger.verify().is_err());
    }

    #[test]
    fn test_append_sealed_extends_tail() {
        let mut source = LedgerStore::new();
        let first = source
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();
        let second = source
            .append(vec![tx(TransactionKind::Isolate, DeviceStatus::Isolated)])
            .unwrap();

        let mut replica = LedgerStore::new();
        replica.append_sealed(first).unwrap();
        replica.append_sealed(second).unwrap();

        assert_eq!(replica.len(), 3);
        assert_eq!(replica.tail_hash(), source.tail_hash());
        assert!(replica.verify().is_ok());
    }

    #[test]
    fn test_append_sealed_reorder_halts() {
        let mut source = LedgerStore::new();
        source
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();
        let second = source
            .append(vec![tx(TransactionKind::Isolate, DeviceStatus::Isolated)])
            .unwrap();

        let mut replica = LedgerStore::new();
        let err = replica.append_sealed(second).unwrap_err();

        assert!(matches!(err, SentinelError::LedgerIntegrityViolation(_)));
        assert!(replica.halted().is_some());
        assert_eq!(replica.len(), 1);
        assert!(replica
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .is_err());
    }

    #[test]
    fn test_append_sealed_forgery_halts() {
        let mut source = LedgerStore::new();
        let first = source
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();

        let mut forged = first.clone();
        forged.transactions[0].gas_fee = 9999;

        let mut replica = LedgerStore::new();
        let err = replica.append_sealed(forged).unwrap_err();

        assert!(matches!(err, SentinelError::LedgerIntegrityViolation(_)));
        assert!(replica.halted().is_some());
        assert!(replica.append_sealed(first).is_err());
    }

    #[tokio::test]
    async fn test_archive_replaces_matches_with_summary() {
        let mut ledger = LedgerStore::new();
        ledger
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();
        let compromised = ledger
            .append(vec![tx(TransactionKind::Compromise, DeviceStatus::Compromised)])
            .unwrap();
        ledger
            .append(vec![tx(TransactionKind::Isolate, DeviceStatus::Isolated)])
            .unwrap();

        let store = MemoryArchiveStore::new();
        let record = ledger
            .archive(default_archive_predicate, &store)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(ledger.len(), 4);
        assert_eq!(record.record_type(), Some(TransactionKind::Archive));
        let summary = record.transactions[0].archive.clone().unwrap();
        assert_eq!(summary.archived_count, 1);
        assert_eq!(summary.archived_hashes, vec![compromised.record_hash.clone()]);
        assert_eq!(store.get(&summary.handle).unwrap(), vec![compromised]);
        assert!(ledger.verify().is_ok());
    }

    #[tokio::test]
    async fn test_deleting_live_record_beside_archived_gap_detected() {
        let mut ledger = LedgerStore::new();
        ledger
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();
        ledger
            .append(vec![tx(TransactionKind::Compromise, DeviceStatus::Compromised)])
            .unwrap();
        ledger
            .append(vec![tx(TransactionKind::Isolate, DeviceStatus::Isolated)])
            .unwrap();
        ledger
            .append(vec![tx(TransactionKind::Compromise, DeviceStatus::Compromised)])
            .unwrap();
        ledger
            .append(vec![tx(TransactionKind::Isolate, DeviceStatus::Isolated)])
            .unwrap();

        let store = MemoryArchiveStore::new();
        ledger
            .archive(default_archive_predicate, &store)
            .await
            .unwrap()
            .unwrap();
        // genesis, register, isolate, isolate, archive
        assert_eq!(ledger.len(), 5);
        assert!(ledger.verify().is_ok());

        // The first isolate sits between two archived gaps
        ledger.records_mut().remove(2);

        let err = ledger.verify().unwrap_err();
        assert!(matches!(err, SentinelError::LedgerIntegrityViolation(_)));
        assert!(ledger.halted().is_some());
    }

    #[test]
    fn test_links_back_walks_only_archived_records() {
        let archived: HashMap<&str, &str> = [("c2", "i1"), ("i1", "c1"), ("c1", "r")]
            .into_iter()
            .collect();

        assert!(links_back(&archived, "r", "r"));
        assert!(links_back(&archived, "c1", "r"));
        assert!(links_back(&archived, "c2", "r"));
        assert!(!links_back(&archived, "c2", "x"));
        assert!(!links_back(&archived, "unknown", "r"));

        let cycle: HashMap<&str, &str> = [("a", "b"), ("b", "a")].into_iter().collect();
        assert!(!links_back(&cycle, "a", "r"));
    }

    #[tokio::test]
    async fn test_archive_nothing_to_do() {
        let mut ledger = LedgerStore::new();
        ledger
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();

        let store = MemoryArchiveStore::new();
        let result = ledger.archive(default_archive_predicate, &store).await.unwrap();

        assert!(result.is_none());
        assert_eq!(ledger.len(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_export_leaves_ledger_untouched() {
        let mut ledger = LedgerStore::new();
        ledger
            .append(vec![tx(TransactionKind::Remove, DeviceStatus::Removed)])
            .unwrap();
        let before = ledger.records().to_vec();

        let err = ledger
            .archive(default_archive_predicate, &FailingStore)
            .await
            .unwrap_err();

        assert!(matches!(err, SentinelError::ExternalStoreFailure(_)));
        assert_eq!(ledger.records(), before.as_slice());
        assert!(ledger.halted().is_none());
    }

    #[test]
    fn test_stale_staging_rejected() {
        let mut ledger = LedgerStore::new();
        ledger
            .append(vec![tx(TransactionKind::Remove, DeviceStatus::Removed)])
            .unwrap();
        let staged = ledger.stage_archive(default_archive_predicate).unwrap();
        ledger
            .append(vec![tx(TransactionKind::Register, DeviceStatus::Active)])
            .unwrap();

        assert!(ledger.commit_archive(staged, "blake3:x".to_string()).is_err());
        assert_eq!(ledger.len(), 3);
    }
}
