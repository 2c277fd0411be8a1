//! Sentinel Topology: seed device lists from Mininet scripts
//!
//! Two entry points, both pure:
//! - [`parse_topology`] turns script text into a [`Topology`]
//! - [`score`] classifies a topology against questionnaire answers
//!
//! # Example
//!
//! ```
//! use sentinel_topology::{parse_topology, score, SecurityAnswers, RiskLevel};
//!
//! let script = "c0 = net.addController(name='c0', port=6633)\n\
//!               s1 = net.addSwitch('s1')\n\
//!               h1 = net.addHost('h1', ip='10.0.0.1')\n\
//!               net.addLink(s1, h1)";
//!
//! let topology = parse_topology(script).unwrap();
//! assert_eq!(topology.hosts[0].ip, "10.0.0.1");
//!
//! let result = score(&topology, &SecurityAnswers::default());
//! assert_eq!(result.risk_level, RiskLevel::Low);
//! ```

pub mod parser;
pub mod risk;

pub use parser::{parse_topology, Host, Link, Topology};
pub use risk::{
    score, Answer, RiskCategory, RiskClassification, RiskFactor, RiskLevel, SecurityAnswers,
    TrafficLoad,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("TOPOLOGY/EMPTY: no topology text supplied")]
    EmptyInput,
    #[error("TOPOLOGY/NO_ELEMENTS: no controllers, switches, hosts or links found")]
    NoElements,
}
