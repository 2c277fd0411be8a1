//! Cosmetic health metrics for the dashboard
//!
//! Every value is a fixed baseline perturbed by bounded noise and recomputed
//! on each call. No state is read or kept.

use rand::Rng;
use serde::{Deserialize, Serialize};

const BASE_ACCURACY: f64 = 90.0;
const BASE_RECOVERY_RATE: f64 = 85.0;
const BASE_RECOVERY_TIME_MS: f64 = 6_000.0;
const BASE_ISOLATION_EFFICIENCY: f64 = 95.0;

const ACCURACY_NOISE: f64 = 2.0;
const RECOVERY_RATE_NOISE: f64 = 5.0;
const RECOVERY_TIME_NOISE_MS: f64 = 1_000.0;
const ISOLATION_EFFICIENCY_NOISE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackSeverity {
    Low,
    Medium,
    High,
}

impl AttackSeverity {
    pub const ALL: [AttackSeverity; 3] = [
        AttackSeverity::Low,
        AttackSeverity::Medium,
        AttackSeverity::High,
    ];
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    /// Detection accuracy (%)
    pub accuracy: f64,
    /// Share of incidents recovered (%)
    pub recovery_rate: f64,
    /// Mean recovery time (ms)
    pub avg_recovery_time: f64,
    /// Isolation efficiency (%)
    pub isolation_efficiency: f64,
    pub attack_severity: AttackSeverity,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsReporter;

impl MetricsReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn current_metrics(&self) -> HealthMetrics {
        self.current_metrics_with(&mut rand::thread_rng())
    }

    pub fn current_metrics_with<R: Rng>(&self, rng: &mut R) -> HealthMetrics {
        HealthMetrics {
            accuracy: add_noise(rng, BASE_ACCURACY, ACCURACY_NOISE),
            recovery_rate: add_noise(rng, BASE_RECOVERY_RATE, RECOVERY_RATE_NOISE),
            avg_recovery_time: add_noise(rng, BASE_RECOVERY_TIME_MS, RECOVERY_TIME_NOISE_MS),
            isolation_efficiency: add_noise(
                rng,
                BASE_ISOLATION_EFFICIENCY,
                ISOLATION_EFFICIENCY_NOISE,
            ),
            attack_severity: AttackSeverity::ALL[rng.gen_range(0..AttackSeverity::ALL.len())],
        }
    }
}

/// `value ± noise`, rounded to two decimals
fn add_noise<R: Rng>(rng: &mut R, value: f64, noise: f64) -> f64 {
    let perturbed = value + rng.gen_range(-noise..=noise);
    (perturbed * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_within_bounds() {
        let reporter = MetricsReporter::new();
        for _ in 0..500 {
            let m = reporter.current_metrics();
            assert!((88.0..=92.0).contains(&m.accuracy), "accuracy {}", m.accuracy);
            assert!((80.0..=90.0).contains(&m.recovery_rate));
            assert!((5_000.0..=7_000.0).contains(&m.avg_recovery_time));
            assert!((92.0..=98.0).contains(&m.isolation_efficiency));
        }
    }

    #[test]
    fn test_two_decimal_rounding() {
        let m = MetricsReporter::new().current_metrics();
        let scaled = m.accuracy * 100.0;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(MetricsReporter::new().current_metrics()).unwrap();
        for key in [
            "accuracy",
            "recoveryRate",
            "avgRecoveryTime",
            "isolationEfficiency",
            "attackSeverity",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        let severity = json["attackSeverity"].as_str().unwrap();
        assert!(["Low", "Medium", "High"].contains(&severity));
    }
}
