//! Sentinel Core: device identities, hash-chained ledger and lifecycle registry
//!
//! # Architecture
//!
//! ```text
//! IdentityKeyGenerator ─→ DeviceRegistry ─→ LedgerStore ─→ ArchiveStore
//!                          (live table)      (hash chain)    (external batches)
//! ```
//!
//! `DeviceRegistry` is the single writer: it validates each lifecycle
//! transition, seals the matching ledger record and only then updates the
//! live table.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sentinel_core::{DeviceRegistry, DeviceStatus, MemoryArchiveStore};
//!
//! let mut registry = DeviceRegistry::new(Arc::new(MemoryArchiveStore::new()));
//! let key = registry.register("thermo1", "10.0.0.5").unwrap().device.identity_key;
//!
//! registry.mark_compromised(&key, "spoofing").unwrap();
//! assert_eq!(registry.get(&key).unwrap().status, DeviceStatus::Isolated);
//!
//! let recovered = registry.recover(&key).unwrap().device;
//! assert_ne!(recovered.identity_key, key);
//! assert_eq!(registry.ledger().len(), 5);
//! ```

pub mod archive;
pub mod data_model;
pub mod error;
pub mod fees;
pub mod identity;
pub mod ledger;
pub mod registry;

pub use archive::{ArchiveStore, MemoryArchiveStore};
pub use data_model::{
    ArchiveSummary, ArchivedLink, Device, DeviceDescriptor, DeviceStatus, LedgerRecord,
    LifecycleReceipt, Transaction, TransactionKind,
};
pub use error::{Result, SentinelError};
pub use identity::IdentityKeyGenerator;
pub use ledger::{default_archive_predicate, LedgerStore, StagedArchive};
pub use registry::{
    assign_model, CompromiseOutcome, DeviceRegistry, RegistryConfig, RemovalOutcome,
    SharedRegistry,
};

/// Engine version reported by the API
pub const SENTINEL_VERSION: &str = "1.0.0";
