//! Operational prometheus counters, exposed at `/metrics/prometheus`
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

pub struct ApiMetrics {
    registry: Registry,
    pub devices_registered: IntCounter,
    pub attacks_injected: IntCounter,
    pub manual_recoveries: IntCounter,
    pub removals: IntCounter,
    pub archive_sweeps: IntCounter,
    pub archive_failures: IntCounter,
    pub pending_recoveries: IntGauge,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let devices_registered = counter(
            &registry,
            "sentinel_devices_registered_total",
            "Devices registered, including topology imports",
        )?;
        let attacks_injected =
            counter(&registry, "sentinel_attacks_injected_total", "Attacks injected")?;
        let manual_recoveries = counter(
            &registry,
            "sentinel_manual_recoveries_total",
            "Recoveries requested over HTTP",
        )?;
        let removals = counter(&registry, "sentinel_removals_total", "Devices removed")?;
        let archive_sweeps = counter(
            &registry,
            "sentinel_archive_sweeps_total",
            "Archive sweeps that committed a batch",
        )?;
        let archive_failures = counter(
            &registry,
            "sentinel_archive_failures_total",
            "Archive exports that failed",
        )?;
        let pending_recoveries = IntGauge::new(
            "sentinel_pending_recoveries",
            "Recovery timers armed at scrape time",
        )?;
        registry.register(Box::new(pending_recoveries.clone()))?;

        Ok(Self {
            registry,
            devices_registered,
            attacks_injected,
            manual_recoveries,
            removals,
            archive_sweeps,
            archive_failures,
            pending_recoveries,
        })
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}
