//! External archive store contract
//!
//! The ledger hands archived batches to an `ArchiveStore` and keeps only the
//! returned handle. `MemoryArchiveStore` is a content-addressed in-process
//! implementation; anything speaking the same contract (IPFS, object
//! storage) can be plugged in instead.

use crate::data_model::LedgerRecord;
use crate::error::{Result, SentinelError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Store a batch and return its content handle.
    async fn export(&self, batch: &[LedgerRecord]) -> Result<String>;
}

/// Serialize a batch the same way for hashing and storing
pub fn encode_batch(batch: &[LedgerRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec(batch)
        .map_err(|e| SentinelError::ExternalStoreFailure(format!("encode batch: {e}")))
}

pub fn content_handle(bytes: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(bytes))
}

#[derive(Debug, Default)]
pub struct MemoryArchiveStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a previously exported batch
    pub fn get(&self, handle: &str) -> Option<Vec<LedgerRecord>> {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        objects
            .get(handle)
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchiveStore {
    async fn export(&self, batch: &[LedgerRecord]) -> Result<String> {
        let bytes = encode_batch(batch)?;
        let handle = content_handle(&bytes);
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.clone(), bytes);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerStore;

    #[tokio::test]
    async fn test_export_is_content_addressed() {
        let ledger = LedgerStore::new();
        let batch = ledger.records().to_vec();
        let store = MemoryArchiveStore::new();

        let first = store.export(&batch).await.unwrap();
        let second = store.export(&batch).await.unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("blake3:"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&first).unwrap(), batch);
    }

    #[test]
    fn test_unknown_handle() {
        let store = MemoryArchiveStore::new();
        assert!(store.get("blake3:00").is_none());
        assert!(store.is_empty());
    }
}
