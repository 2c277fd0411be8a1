//! Incident Simulator: synthetic compromise and delayed recovery
//!
//! Each injected attack compromises (and thereby isolates) a device and
//! schedules a one-shot recovery timer keyed by the identity key. The timer
//! runs on tokio's clock, so tests drive it with a paused runtime instead of
//! real sleeps.

use rand::Rng;
use sentinel_core::{
    CompromiseOutcome, LifecycleReceipt, RemovalOutcome, Result, SentinelError, SharedRegistry,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Lower bound of the uniform recovery delay (ms)
    pub recovery_delay_min_ms: u64,
    /// Upper bound of the uniform recovery delay (ms)
    pub recovery_delay_max_ms: u64,
    /// Bound on concurrently pending recovery timers
    pub max_pending_recoveries: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            recovery_delay_min_ms: 3_000,
            recovery_delay_max_ms: 10_000,
            max_pending_recoveries: 1_024,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.recovery_delay_min_ms > self.recovery_delay_max_ms {
            return Err(SentinelError::InvalidArgument(format!(
                "recovery delay min {}ms exceeds max {}ms",
                self.recovery_delay_min_ms, self.recovery_delay_max_ms
            )));
        }
        if self.max_pending_recoveries == 0 {
            return Err(SentinelError::InvalidArgument(
                "max pending recoveries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Draw a delay uniformly from `[min, max]`
    pub fn sample_delay(&self) -> Duration {
        let ms = rand::thread_rng()
            .gen_range(self.recovery_delay_min_ms..=self.recovery_delay_max_ms);
        Duration::from_millis(ms)
    }
}

/// What `inject_attack` did and when recovery is due
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackOutcome {
    #[serde(flatten)]
    pub compromise: CompromiseOutcome,
    pub attack_type: String,
    pub recovery_delay_ms: u64,
}

type PendingTimers = Arc<Mutex<HashMap<String, AbortHandle>>>;

#[derive(Clone)]
pub struct IncidentSimulator {
    registry: SharedRegistry,
    pending: PendingTimers,
    config: SimulatorConfig,
}

impl IncidentSimulator {
    pub fn new(registry: SharedRegistry, config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            pending: Arc::new(Mutex::new(HashMap::new())),
            config,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Number of recovery timers that have not fired yet
    pub fn pending_recoveries(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    pub fn has_pending_recovery(&self, identity_key: &str) -> bool {
        lock_pending(&self.pending).contains_key(identity_key)
    }

    /// Compromise an active device and schedule its automatic recovery.
    /// Returns as soon as the timer is armed.
    pub async fn inject_attack(&self, identity_key: &str, attack_type: &str) -> Result<AttackOutcome> {
        // Held until the timer is registered, so the timer cannot observe
        // the registry before its own pending entry exists.
        let mut registry = self.registry.lock().await;

        {
            let pending = lock_pending(&self.pending);
            if pending.contains_key(identity_key) {
                return Err(SentinelError::InvalidArgument(format!(
                    "recovery already pending for {identity_key}"
                )));
            }
            if pending.len() >= self.config.max_pending_recoveries {
                return Err(SentinelError::CapacityExceeded(format!(
                    "{} recoveries already pending",
                    pending.len()
                )));
            }
        }

        let compromise = registry.mark_compromised(identity_key, attack_type)?;
        let delay = self.config.sample_delay();
        self.schedule_recovery(identity_key.to_string(), delay);

        info!(
            identity_key = %identity_key,
            attack_type = %attack_type,
            delay_ms = delay.as_millis() as u64,
            "Attack injected, recovery scheduled"
        );
        Ok(AttackOutcome {
            compromise,
            attack_type: attack_type.to_string(),
            recovery_delay_ms: delay.as_millis() as u64,
        })
    }

    /// Recover an isolated device now, neutralizing its pending timer
    pub async fn recover_now(&self, identity_key: &str) -> Result<LifecycleReceipt> {
        let mut registry = self.registry.lock().await;
        let receipt = registry.recover(identity_key)?;
        self.cancel(identity_key);
        Ok(receipt)
    }

    /// Remove (and re-identify) a device, neutralizing its pending timer
    pub async fn remove(&self, identity_key: &str) -> Result<RemovalOutcome> {
        let mut registry = self.registry.lock().await;
        let outcome = registry.remove(identity_key).await?;
        self.cancel(identity_key);
        Ok(outcome)
    }

    fn schedule_recovery(&self, identity_key: String, delay: Duration) {
        let registry = Arc::clone(&self.registry);
        let pending = Arc::clone(&self.pending);
        let key = identity_key.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut registry = registry.lock().await;
            lock_pending(&pending).remove(&key);

            // The key may have been recovered or removed by hand meanwhile
            match registry.recover(&key) {
                Ok(receipt) => info!(
                    old_key = %key,
                    new_key = %receipt.device.identity_key,
                    "Scheduled recovery completed"
                ),
                Err(e) => warn!(identity_key = %key, error = %e, "Stale recovery timer ignored"),
            }
        });

        lock_pending(&self.pending).insert(identity_key, task.abort_handle());
    }

    fn cancel(&self, identity_key: &str) {
        if let Some(handle) = lock_pending(&self.pending).remove(identity_key) {
            handle.abort();
            info!(identity_key = %identity_key, "Pending recovery cancelled");
        }
    }
}

fn lock_pending(
    pending: &Mutex<HashMap<String, AbortHandle>>,
) -> std::sync::MutexGuard<'_, HashMap<String, AbortHandle>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_demo_delays() {
        let config = SimulatorConfig::default();
        assert_eq!(config.recovery_delay_min_ms, 3_000);
        assert_eq!(config.recovery_delay_max_ms, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sampled_delay_in_bounds() {
        let config = SimulatorConfig::default();
        for _ in 0..100 {
            let delay = config.sample_delay();
            assert!(delay >= Duration::from_millis(3_000));
            assert!(delay <= Duration::from_millis(10_000));
        }
    }

    #[test]
    fn test_invalid_config() {
        let inverted = SimulatorConfig {
            recovery_delay_min_ms: 5_000,
            recovery_delay_max_ms: 1_000,
            ..SimulatorConfig::default()
        };
        assert!(inverted.validate().is_err());

        let no_capacity = SimulatorConfig {
            max_pending_recoveries: 0,
            ..SimulatorConfig::default()
        };
        assert!(no_capacity.validate().is_err());
    }
}
