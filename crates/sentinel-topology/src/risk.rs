//! Network risk classification
//!
//! Scores a parsed topology plus a short security questionnaire. Each rule
//! adds or subtracts points and records why; the total maps to a level.

use crate::parser::Topology;
use serde::{Deserialize, Serialize};

/// Risk level of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum RiskLevel {
    /// score < 8
    #[default]
    #[serde(rename = "Low Risk")]
    Low,
    /// 8 <= score < 15
    #[serde(rename = "Medium Risk")]
    Medium,
    /// score >= 15
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLevel {
    pub fn from_score(score: i32) -> Self {
        if score >= 15 {
            RiskLevel::High
        } else if score >= 8 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low Risk"),
            RiskLevel::Medium => write!(f, "Medium Risk"),
            RiskLevel::High => write!(f, "High Risk"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLoad {
    Low,
    Medium,
    High,
}

/// Operator answers to the security questionnaire. Unanswered questions
/// do not move the score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAnswers {
    #[serde(default)]
    pub traffic_load: Option<TrafficLoad>,
    #[serde(default)]
    pub intrusion_detection: Option<Answer>,
    #[serde(default, alias = "useTLS")]
    pub use_tls: Option<Answer>,
    #[serde(default)]
    pub network_segmentation: Option<Answer>,
    #[serde(default)]
    pub open_ports: Option<u32>,
    #[serde(default)]
    pub outdated_software: Option<Answer>,
}

/// Area of the network a factor comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Controllers,
    Switching,
    Hosts,
    Links,
    Traffic,
    Protocols,
    Segmentation,
    Vulnerabilities,
}

/// A single scored observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub impact: i32,
    pub reason: String,
    pub category: RiskCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskClassification {
    pub risk_level: RiskLevel,
    pub score: i32,
    pub reasons: Vec<String>,
    pub factors: Vec<RiskFactor>,
}

impl RiskClassification {
    fn from_factors(factors: Vec<RiskFactor>) -> Self {
        let score = factors.iter().map(|f| f.impact).sum();
        Self {
            risk_level: RiskLevel::from_score(score),
            score,
            reasons: factors.iter().map(|f| f.reason.clone()).collect(),
            factors,
        }
    }
}

fn is_internal(ip: &str) -> bool {
    ["192.", "10.", "172."].iter().any(|p| ip.starts_with(p))
}

/// Classify a topology against the questionnaire answers
pub fn score(topology: &Topology, answers: &SecurityAnswers) -> RiskClassification {
    let mut factors = Vec::new();
    let mut push = |impact: i32, category: RiskCategory, reason: String| {
        factors.push(RiskFactor {
            impact,
            reason,
            category,
        });
    };

    match topology.controllers.len() {
        0 => {}
        1 => push(
            2,
            RiskCategory::Controllers,
            "Single controller increases risk (single point of failure).".to_string(),
        ),
        _ => push(
            -1,
            RiskCategory::Controllers,
            "Multiple controllers reduce risk (distributed control).".to_string(),
        ),
    }

    let switches = topology.switches.len();
    if switches > 10 {
        push(
            3,
            RiskCategory::Switching,
            "High number of switches increases complexity and attack surface.".to_string(),
        );
    } else if switches <= 3 {
        push(
            -1,
            RiskCategory::Switching,
            "Low number of switches suggests a simpler network with reduced complexity."
                .to_string(),
        );
    }
    if topology.switches.iter().any(|s| s.contains("vlan")) {
        push(
            -2,
            RiskCategory::Segmentation,
            "VLAN segmentation reduces the risk of lateral movement.".to_string(),
        );
    }

    if topology.hosts.len() > 20 {
        push(
            4,
            RiskCategory::Hosts,
            "High number of hosts (IoT devices) increases risk.".to_string(),
        );
    }
    for host in &topology.hosts {
        if is_internal(&host.ip) {
            push(
                -1,
                RiskCategory::Hosts,
                format!("Host {} is using internal IP (reduced risk).", host.name),
            );
        } else {
            push(
                3,
                RiskCategory::Hosts,
                format!("Host {} is exposed to the internet (increases risk).", host.name),
            );
        }
    }

    for link in &topology.links {
        if link.from.contains("secure") && link.to.contains("secure") {
            push(-1, RiskCategory::Links, "Encrypted link reduces risk.".to_string());
        } else {
            push(2, RiskCategory::Links, "Unencrypted link increases risk.".to_string());
        }
    }

    match (answers.traffic_load, answers.intrusion_detection) {
        (Some(TrafficLoad::High), Some(Answer::No)) => push(
            4,
            RiskCategory::Traffic,
            "High traffic without IDS increases risk of undetected attacks.".to_string(),
        ),
        (Some(TrafficLoad::Low), Some(Answer::Yes)) => push(
            -2,
            RiskCategory::Traffic,
            "Low traffic with IDS decreases the likelihood of undetected attacks.".to_string(),
        ),
        _ => {}
    }

    if answers.use_tls == Some(Answer::No) {
        push(
            3,
            RiskCategory::Protocols,
            "Lack of TLS increases the risk of interception and data leakage.".to_string(),
        );
    }
    if answers.network_segmentation == Some(Answer::No) {
        push(
            4,
            RiskCategory::Segmentation,
            "Lack of network segmentation increases lateral movement risk.".to_string(),
        );
    }
    if answers.open_ports.unwrap_or(0) > 5 {
        push(
            3,
            RiskCategory::Vulnerabilities,
            "Multiple open ports increase the attack surface.".to_string(),
        );
    }
    if answers.outdated_software == Some(Answer::Yes) {
        push(
            3,
            RiskCategory::Vulnerabilities,
            "Outdated software increases vulnerability to known exploits.".to_string(),
        );
    }

    RiskClassification::from_factors(factors)
}
