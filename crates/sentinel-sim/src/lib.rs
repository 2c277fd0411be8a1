//! Sentinel Sim: incident injection, synthetic readings and dashboard metrics
//!
//! ```text
//! inject_attack ─→ DeviceRegistry.mark_compromised ─→ isolated
//!       └─→ timer (3-10s) ─→ DeviceRegistry.recover ─→ active, new key
//! ```

pub mod metrics;
pub mod readings;
pub mod simulator;

pub use metrics::{AttackSeverity, HealthMetrics, MetricsReporter};
pub use readings::{
    readings_for, simulate_reading, ReadingRange, ReadingValue, SensorKind, SimulatedReading,
};
pub use simulator::{AttackOutcome, IncidentSimulator, SimulatorConfig};
