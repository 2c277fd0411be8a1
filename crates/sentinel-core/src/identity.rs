//! Identity key generation
//!
//! Keys are blake3 digests over the device attributes, a nanosecond
//! timestamp and a random nonce, so the same descriptor never yields the
//! same key twice.

use crate::data_model::DeviceDescriptor;
use crate::error::{Result, SentinelError};
use chrono::Utc;
use rand::Rng;

/// Length in hex characters of every generated key (256-bit digest)
pub const IDENTITY_KEY_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityKeyGenerator;

impl IdentityKeyGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, descriptor: &DeviceDescriptor) -> Result<String> {
        validate_descriptor(descriptor)?;

        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let nonce: u64 = rand::thread_rng().gen();

        let mut hasher = blake3::Hasher::new();
        hasher.update(descriptor.name.as_bytes());
        hasher.update(b"-");
        hasher.update(descriptor.address.as_bytes());
        hasher.update(b"-");
        hasher.update(&timestamp.to_le_bytes());
        hasher.update(b"-");
        hasher.update(&nonce.to_le_bytes());

        Ok(hasher.finalize().to_hex().to_string())
    }
}

pub(crate) fn validate_descriptor(descriptor: &DeviceDescriptor) -> Result<()> {
    if descriptor.name.trim().is_empty() {
        return Err(SentinelError::InvalidDeviceDescriptor(
            "device name is required".to_string(),
        ));
    }
    if descriptor.address.trim().is_empty() {
        return Err(SentinelError::InvalidDeviceDescriptor(
            "device address is required".to_string(),
        ));
    }
    Ok(())
}
