//! Unified Error Model
use crate::data_model::DeviceStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SentinelError {
    #[error("ARG/{0}")]
    InvalidArgument(String),

    #[error("DEVICE/DESCRIPTOR: {0}")]
    InvalidDeviceDescriptor(String),

    #[error("DEVICE/NOT_FOUND: {0}")]
    DeviceNotFound(String),

    #[error("DEVICE/DUPLICATE: {name}@{address} is already registered")]
    DuplicateDevice { name: String, address: String },

    #[error("DEVICE/TRANSITION: {identity_key} is {actual}, expected {expected}")]
    InvalidTransition {
        identity_key: String,
        expected: DeviceStatus,
        actual: DeviceStatus,
    },

    #[error("LEDGER/INTEGRITY: {0}")]
    LedgerIntegrityViolation(String),

    #[error("STORE/{0}")]
    ExternalStoreFailure(String),

    #[error("CAPACITY/{0}")]
    CapacityExceeded(String),
}

impl SentinelError {
    /// Stable machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidDeviceDescriptor(_) => "invalid_device_descriptor",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::DuplicateDevice { .. } => "duplicate_device",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::LedgerIntegrityViolation(_) => "ledger_integrity_violation",
            Self::ExternalStoreFailure(_) => "external_store_failure",
            Self::CapacityExceeded(_) => "capacity_exceeded",
        }
    }
}

pub type Result<T> = std::result::Result<T, SentinelError>;
