//! Data Model: Device, Transaction, LedgerRecord
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a live device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Active,
    Compromised,
    Isolated,
    Removed,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DeviceStatus::Active => write!(f, "active"),
            DeviceStatus::Compromised => write!(f, "compromised"),
            DeviceStatus::Isolated => write!(f, "isolated"),
            DeviceStatus::Removed => write!(f, "removed"),
        }
    }
}

/// What a caller knows about a device before it has an identity key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub name: String,
    pub address: String,
}

impl DeviceDescriptor {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// One network node in the live table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Human label (ex: "thermo1")
    pub name: String,
    /// Network address (ex: "10.0.0.5")
    pub network_address: String,
    /// Currently valid identity key, primary key of the registry
    pub identity_key: String,
    pub status: DeviceStatus,
    /// Analytics model assigned via `assign_model`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Device {
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor::new(self.name.clone(), self.network_address.clone())
    }
}

/// Kind of lifecycle event sealed in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Register,
    Compromise,
    Isolate,
    Recover,
    Remove,
    Archive,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            TransactionKind::Register => "register",
            TransactionKind::Compromise => "compromise",
            TransactionKind::Isolate => "isolate",
            TransactionKind::Recover => "recover",
            TransactionKind::Remove => "remove",
            TransactionKind::Archive => "archive",
        };
        f.write_str(s)
    }
}

/// Reference to an exported batch of archived records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSummary {
    /// Content-addressed handle returned by the archive store
    pub handle: String,
    pub archived_count: usize,
    /// Record hashes that left the live ledger with this batch
    pub archived_hashes: Vec<String>,
    /// Chain links of the archived records, so a gap can be walked back
    /// to the live record it started from
    #[serde(default)]
    pub archived_links: Vec<ArchivedLink>,
}

/// `(record_hash, previous_record_hash)` of one archived record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedLink {
    pub record_hash: String,
    pub previous_record_hash: String,
}

/// A single lifecycle fact, sealed into a `LedgerRecord`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_key_before: Option<String>,
    /// Present only for `recover`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_key_after: Option<String>,
    /// Device status at the time of the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_type: Option<String>,
    #[serde(default)]
    pub gas_fee: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveSummary>,
}

impl Transaction {
    /// Transaction about a device under its current key
    pub fn for_device(kind: TransactionKind, device: &Device, gas_fee: u64) -> Self {
        Self {
            kind,
            device_name: Some(device.name.clone()),
            device_address: Some(device.network_address.clone()),
            identity_key_before: Some(device.identity_key.clone()),
            identity_key_after: None,
            status: Some(device.status),
            attack_type: None,
            gas_fee,
            timestamp: Utc::now(),
            archive: None,
        }
    }

    /// Recovery linking the retired key to the freshly issued one
    pub fn recovery(old_key: &str, recovered: &Device, gas_fee: u64) -> Self {
        let mut tx = Self::for_device(TransactionKind::Recover, recovered, gas_fee);
        tx.identity_key_before = Some(old_key.to_string());
        tx.identity_key_after = Some(recovered.identity_key.clone());
        tx
    }

    pub fn archive(summary: ArchiveSummary) -> Self {
        Self {
            kind: TransactionKind::Archive,
            device_name: None,
            device_address: None,
            identity_key_before: None,
            identity_key_after: None,
            status: None,
            attack_type: None,
            gas_fee: 0,
            timestamp: Utc::now(),
            archive: Some(summary),
        }
    }

    pub fn with_attack(mut self, attack_type: impl Into<String>) -> Self {
        self.attack_type = Some(attack_type.into());
        self
    }
}

/// A sealed block of the hash chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    /// Empty only for genesis
    pub transactions: Vec<Transaction>,
    pub previous_record_hash: String,
    pub record_hash: String,
}

impl LedgerRecord {
    pub fn is_genesis(&self) -> bool {
        self.previous_record_hash == crate::ledger::GENESIS_PREVIOUS_HASH
    }

    /// Kind of the first sealed transaction; `None` for genesis
    pub fn record_type(&self) -> Option<TransactionKind> {
        self.transactions.first().map(|tx| tx.kind)
    }

    pub fn has_kind(&self, kind: TransactionKind) -> bool {
        self.transactions.iter().any(|tx| tx.kind == kind)
    }

    pub fn has_status(&self, status: DeviceStatus) -> bool {
        self.transactions.iter().any(|tx| tx.status == Some(status))
    }
}

/// Outcome of a lifecycle operation: the device as it now stands plus the
/// record that sealed the change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleReceipt {
    pub device: Device,
    pub transaction: Transaction,
    pub ledger_record: LedgerRecord,
}
