//! Gas fee schedule attached to device transactions. Cosmetic only.
use crate::data_model::TransactionKind;
use rand::Rng;

/// Base fee and exclusive upper bound of the random surcharge
pub fn fee_schedule(kind: TransactionKind) -> (u64, u64) {
    match kind {
        TransactionKind::Register => (10, 5),
        TransactionKind::Remove => (15, 8),
        TransactionKind::Recover => (25, 12),
        _ => (5, 2),
    }
}

pub fn calculate_gas_fee(kind: TransactionKind) -> u64 {
    let (base, variance) = fee_schedule(kind);
    base + rand::thread_rng().gen_range(0..variance)
}
