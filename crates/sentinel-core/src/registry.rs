//! Device Registry: live device table and lifecycle state machine
//!
//! ```text
//! active → compromised → isolated → active (recovered, new key)
//!    ↓          ↓            ↓
//!    └──────────┴────────────┴──→ removed → active (re-identified, new key)
//! ```
//!
//! The registry owns the ledger so a state change and the record sealing it
//! are always applied together. Every mutation checks its guards and
//! seals the ledger record before touching the live table; if sealing
//! fails the table is left as it was.

use crate::archive::ArchiveStore;
use crate::data_model::{
    Device, DeviceDescriptor, DeviceStatus, LedgerRecord, LifecycleReceipt, Transaction,
    TransactionKind,
};
use crate::error::{Result, SentinelError};
use crate::fees::calculate_gas_fee;
use crate::identity::{validate_descriptor, IdentityKeyGenerator};
use crate::ledger::{default_archive_predicate, LedgerStore};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Registration policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Allow a second live device with the same name and address
    #[serde(default = "default_allow_duplicates")]
    pub allow_duplicates: bool,
}

fn default_allow_duplicates() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_duplicates: default_allow_duplicates(),
        }
    }
}

/// Result of `mark_compromised`: the device ends up isolated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompromiseOutcome {
    pub device: Device,
    pub compromise_record: LedgerRecord,
    pub isolate_record: LedgerRecord,
}

/// Result of `remove`: the removal is sealed, then the device is
/// re-admitted under a fresh identity key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalOutcome {
    /// The device as it now stands (active, new key)
    pub device: Device,
    pub removed_identity_key: String,
    pub removal_record: LedgerRecord,
    pub recovery_record: LedgerRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_record: Option<LedgerRecord>,
}

/// Registry and ledger behind the single lock every writer goes through
pub type SharedRegistry = Arc<tokio::sync::Mutex<DeviceRegistry>>;

pub struct DeviceRegistry {
    devices: HashMap<String, Device>,
    retired_keys: HashSet<String>,
    ledger: LedgerStore,
    keys: IdentityKeyGenerator,
    archive_store: Arc<dyn ArchiveStore>,
    config: RegistryConfig,
}

impl DeviceRegistry {
    pub fn new(archive_store: Arc<dyn ArchiveStore>) -> Self {
        Self::with_config(archive_store, RegistryConfig::default())
    }

    pub fn with_config(archive_store: Arc<dyn ArchiveStore>, config: RegistryConfig) -> Self {
        Self {
            devices: HashMap::new(),
            retired_keys: HashSet::new(),
            ledger: LedgerStore::new(),
            keys: IdentityKeyGenerator::new(),
            archive_store,
            config,
        }
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// Recheck the whole hash chain; a failure halts further writes
    pub fn verify_ledger(&mut self) -> Result<()> {
        self.ledger.verify()
    }

    pub fn get(&self, identity_key: &str) -> Option<&Device> {
        self.devices.get(identity_key)
    }

    /// Live devices ordered by name, then key
    pub fn list(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.values().cloned().collect();
        devices.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.identity_key.cmp(&b.identity_key))
        });
        devices
    }

    pub fn list_by_status(&self, status: DeviceStatus) -> Vec<Device> {
        self.list()
            .into_iter()
            .filter(|d| d.status == status)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Whether `identity_key` was rotated away by a recovery
    pub fn is_retired(&self, identity_key: &str) -> bool {
        self.retired_keys.contains(identity_key)
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<LifecycleReceipt> {
        let descriptor = DeviceDescriptor::new(name, address);
        validate_descriptor(&descriptor)?;

        if !self.config.allow_duplicates {
            let taken = self
                .devices
                .values()
                .any(|d| d.name == descriptor.name && d.network_address == descriptor.address);
            if taken {
                return Err(SentinelError::DuplicateDevice {
                    name: descriptor.name,
                    address: descriptor.address,
                });
            }
        }

        let device = Device {
            identity_key: self.fresh_key(&descriptor)?,
            name: descriptor.name,
            network_address: descriptor.address,
            status: DeviceStatus::Active,
            model: None,
        };

        let transaction = Transaction::for_device(
            TransactionKind::Register,
            &device,
            calculate_gas_fee(TransactionKind::Register),
        );
        let ledger_record = self.ledger.append(vec![transaction.clone()])?;
        self.devices
            .insert(device.identity_key.clone(), device.clone());

        info!(
            device = %device.name,
            address = %device.network_address,
            identity_key = %device.identity_key,
            "Device registered"
        );
        Ok(LifecycleReceipt {
            device,
            transaction,
            ledger_record,
        })
    }

    /// Flag an active device as compromised, then isolate it immediately
    pub fn mark_compromised(
        &mut self,
        identity_key: &str,
        attack_type: &str,
    ) -> Result<CompromiseOutcome> {
        if attack_type.trim().is_empty() {
            return Err(SentinelError::InvalidArgument(
                "attack type is required".to_string(),
            ));
        }
        let mut device = self.require(identity_key, DeviceStatus::Active)?;
        device.status = DeviceStatus::Compromised;

        let transaction = Transaction::for_device(
            TransactionKind::Compromise,
            &device,
            calculate_gas_fee(TransactionKind::Compromise),
        )
        .with_attack(attack_type);
        let compromise_record = self.ledger.append(vec![transaction])?;
        self.devices.insert(identity_key.to_string(), device.clone());

        warn!(
            device = %device.name,
            identity_key = %identity_key,
            attack_type = %attack_type,
            "Device compromised"
        );

        let isolated = self.isolate(identity_key)?;
        Ok(CompromiseOutcome {
            device: isolated.device,
            compromise_record,
            isolate_record: isolated.ledger_record,
        })
    }

    pub fn isolate(&mut self, identity_key: &str) -> Result<LifecycleReceipt> {
        let mut device = self.require(identity_key, DeviceStatus::Compromised)?;
        device.status = DeviceStatus::Isolated;

        let transaction = Transaction::for_device(
            TransactionKind::Isolate,
            &device,
            calculate_gas_fee(TransactionKind::Isolate),
        );
        let ledger_record = self.ledger.append(vec![transaction.clone()])?;
        self.devices.insert(identity_key.to_string(), device.clone());

        info!(device = %device.name, identity_key = %identity_key, "Device isolated");
        Ok(LifecycleReceipt {
            device,
            transaction,
            ledger_record,
        })
    }

    /// Re-admit an isolated device under a newly generated key. The old key
    /// is retired, so a second call with it fails with `DeviceNotFound`.
    pub fn recover(&mut self, identity_key: &str) -> Result<LifecycleReceipt> {
        let device = self.require(identity_key, DeviceStatus::Isolated)?;
        self.reissue(identity_key, device)
    }

    /// Remove a device: sweep the ledger into the archive store, seal the
    /// removal and immediately re-identify the device under a new key.
    ///
    /// The archive export is the only suspension point and happens before
    /// anything is mutated, so a failed export leaves the registry and the
    /// ledger exactly as they were.
    pub async fn remove(&mut self, identity_key: &str) -> Result<RemovalOutcome> {
        let device = self
            .devices
            .get(identity_key)
            .cloned()
            .ok_or_else(|| SentinelError::DeviceNotFound(identity_key.to_string()))?;
        self.ledger.ensure_writable()?;

        let export = match self.ledger.stage_archive(default_archive_predicate) {
            Some(staged) => {
                let store = Arc::clone(&self.archive_store);
                let handle = store.export(&staged.batch).await.map_err(|e| {
                    warn!(identity_key = %identity_key, error = %e, "Archive export failed, removal rolled back");
                    e
                })?;
                Some((staged, handle))
            }
            None => None,
        };

        let archive_record = match export {
            Some((staged, handle)) => Some(self.ledger.commit_archive(staged, handle)?),
            None => None,
        };

        let mut removed = device;
        removed.status = DeviceStatus::Removed;
        let removal = Transaction::for_device(
            TransactionKind::Remove,
            &removed,
            calculate_gas_fee(TransactionKind::Remove),
        );
        let removal_record = self.ledger.append(vec![removal])?;
        self.devices.insert(identity_key.to_string(), removed.clone());
        info!(device = %removed.name, identity_key = %identity_key, "Device removed");

        let recovered = self.reissue(identity_key, removed)?;
        Ok(RemovalOutcome {
            device: recovered.device,
            removed_identity_key: identity_key.to_string(),
            removal_record,
            recovery_record: recovered.ledger_record,
            archive_record,
        })
    }

    /// Standalone archival sweep with the default policy
    pub async fn archive(&mut self) -> Result<Option<LedgerRecord>> {
        let store = Arc::clone(&self.archive_store);
        self.ledger
            .archive(default_archive_predicate, store.as_ref())
            .await
    }

    /// Tag every live device with `<network_type>-model`
    pub fn assign_model_to_all(&mut self, network_type: &str) -> Result<Vec<Device>> {
        let mut devices: Vec<Device> = self.list();
        assign_model(network_type, &mut devices)?;
        for device in &devices {
            if let Some(live) = self.devices.get_mut(&device.identity_key) {
                live.model = device.model.clone();
            }
        }
        info!(network_type = %network_type, count = devices.len(), "Models assigned");
        Ok(devices)
    }

    fn require(&self, identity_key: &str, expected: DeviceStatus) -> Result<Device> {
        let device = self
            .devices
            .get(identity_key)
            .ok_or_else(|| SentinelError::DeviceNotFound(identity_key.to_string()))?;
        if device.status != expected {
            return Err(SentinelError::InvalidTransition {
                identity_key: identity_key.to_string(),
                expected,
                actual: device.status,
            });
        }
        Ok(device.clone())
    }

    /// Rotate `old_key` to a fresh key and mark the device active
    fn reissue(&mut self, old_key: &str, device: Device) -> Result<LifecycleReceipt> {
        let new_key = self.fresh_key(&device.descriptor())?;
        let recovered = Device {
            identity_key: new_key,
            status: DeviceStatus::Active,
            ..device
        };

        let transaction = Transaction::recovery(
            old_key,
            &recovered,
            calculate_gas_fee(TransactionKind::Recover),
        );
        let ledger_record = self.ledger.append(vec![transaction.clone()])?;

        self.devices.remove(old_key);
        self.retired_keys.insert(old_key.to_string());
        self.devices
            .insert(recovered.identity_key.clone(), recovered.clone());

        info!(
            device = %recovered.name,
            old_key = %old_key,
            new_key = %recovered.identity_key,
            "Device recovered with new identity key"
        );
        Ok(LifecycleReceipt {
            device: recovered,
            transaction,
            ledger_record,
        })
    }

    fn fresh_key(&self, descriptor: &DeviceDescriptor) -> Result<String> {
        loop {
            let key = self.keys.generate(descriptor)?;
            if !self.devices.contains_key(&key) && !self.retired_keys.contains(&key) {
                return Ok(key);
            }
        }
    }
}

/// Assign `<network_type>-model` to every device in the batch
pub fn assign_model(network_type: &str, devices: &mut [Device]) -> Result<()> {
    let network_type = network_type.trim();
    if network_type.is_empty() {
        return Err(SentinelError::InvalidArgument(
            "network type is required".to_string(),
        ));
    }
    let model = format!("{network_type}-model");
    for device in devices.iter_mut() {
        device.model = Some(model.clone());
    }
    Ok(())
}
