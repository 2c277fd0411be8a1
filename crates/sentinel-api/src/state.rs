//! Shared handler state
use crate::config::ServerConfig;
use crate::metrics::ApiMetrics;
use sentinel_core::{ArchiveStore, DeviceRegistry, MemoryArchiveStore, SharedRegistry};
use sentinel_sim::{IncidentSimulator, MetricsReporter};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub simulator: IncidentSimulator,
    pub reporter: MetricsReporter,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(config: &ServerConfig, archive_store: Arc<dyn ArchiveStore>) -> anyhow::Result<Self> {
        let registry = DeviceRegistry::with_config(archive_store, config.registry()).into_shared();
        let simulator = IncidentSimulator::new(Arc::clone(&registry), config.simulator())?;
        Ok(Self {
            registry,
            simulator,
            reporter: MetricsReporter::new(),
            metrics: Arc::new(ApiMetrics::new()?),
        })
    }

    /// State backed by the in-memory archive store
    pub fn in_memory(config: &ServerConfig) -> anyhow::Result<Self> {
        Self::new(config, Arc::new(MemoryArchiveStore::new()))
    }
}
