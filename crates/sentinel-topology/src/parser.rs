//! Mininet topology extraction.
//!
//! Recognizes the four `net.add*` calls a generated Mininet script uses:
//! - `net.addController(... name='c0' ...)`
//! - `net.addSwitch('s1' ...)`
//! - `net.addHost('h1', ... ip='10.0.0.1' ...)`
//! - `net.addLink(a, b ...)`
//!
//! Arguments may span several lines. Everything else in the script is
//! ignored.

use crate::TopologyError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref CONTROLLER: Regex =
        Regex::new(r"net\.addController\([^)]*?name\s*=\s*'(\w+)'").unwrap();
    static ref SWITCH: Regex = Regex::new(r"net\.addSwitch\(\s*'(\w+)'").unwrap();
    static ref HOST: Regex =
        Regex::new(r"net\.addHost\(\s*'(\w+)'[^)]*?ip\s*=\s*'([\d.]+)").unwrap();
    static ref LINK: Regex = Regex::new(r"net\.addLink\(\s*(\w+)\s*,\s*(\w+)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub controllers: Vec<String>,
    pub switches: Vec<String>,
    pub hosts: Vec<Host>,
    pub links: Vec<Link>,
}

impl Topology {
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
            && self.switches.is_empty()
            && self.hosts.is_empty()
            && self.links.is_empty()
    }
}

/// Extract controllers, switches, hosts and links from a Mininet script
pub fn parse_topology(text: &str) -> Result<Topology, TopologyError> {
    if text.trim().is_empty() {
        return Err(TopologyError::EmptyInput);
    }

    let topology = Topology {
        controllers: CONTROLLER
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect(),
        switches: SWITCH
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect(),
        hosts: HOST
            .captures_iter(text)
            .map(|c| Host {
                name: c[1].to_string(),
                ip: c[2].to_string(),
            })
            .collect(),
        links: LINK
            .captures_iter(text)
            .map(|c| Link {
                from: c[1].to_string(),
                to: c[2].to_string(),
            })
            .collect(),
    };

    if topology.is_empty() {
        return Err(TopologyError::NoElements);
    }
    Ok(topology)
}
