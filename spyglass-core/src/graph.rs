//! The enrichment graph: domains -> subdomains -> ip addresses -> ports,
//! web probes and sensitive paths.
//!
//! The graph is owned by exactly one pipeline phase at a time; the
//! orchestrator hands it to each stage by exclusive reference, so mutation
//! needs no locking. Maps are ordered so exported snapshots are
//! deterministic.

use serde::Serialize;
use spyglass_engine::http::LiveProbe;
use std::collections::{BTreeMap, BTreeSet};

/// One domain or subdomain and everything learned about it.
#[derive(Debug, Clone, Serialize)]
pub struct DomainNode {
    pub value: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub sources: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub subdomains: BTreeMap<String, DomainNode>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ip_addresses: BTreeMap<String, IpNode>,
    /// HTTP-probe results keyed by scheme ("http", "https").
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub web: BTreeMap<String, LiveProbe>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<String, PathNode>,
}

impl DomainNode {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            node_type: "domain".to_string(),
            sources: BTreeSet::new(),
            subdomains: BTreeMap::new(),
            ip_addresses: BTreeMap::new(),
            web: BTreeMap::new(),
            paths: BTreeMap::new(),
        }
    }

    pub fn with_source(value: impl Into<String>, source: impl Into<String>) -> Self {
        let mut node = Self::new(value);
        node.sources.insert(source.into());
        node
    }
}

/// One IP address under one owning hostname. The same physical IP reachable
/// through two hostnames gets two independent nodes; port-scan results are
/// still shared across owners (see `apply_open_ports`).
#[derive(Debug, Clone, Serialize)]
pub struct IpNode {
    pub value: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_ip: Option<GeoIpData>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ports: BTreeMap<u16, PortNode>,
}

impl IpNode {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            node_type: "ip_address".to_string(),
            geo_ip: None,
            ports: BTreeMap::new(),
        }
    }
}

/// Only open ports are ever materialized.
#[derive(Debug, Clone, Serialize)]
pub struct PortNode {
    pub value: u16,
    pub status: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

impl PortNode {
    pub fn open(value: u16) -> Self {
        Self {
            value,
            status: "open".to_string(),
            node_type: "tcp_port".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PathNode {
    pub value: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Where the path resolved to, when it differs from the requested one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    pub description: String,
}

impl PathNode {
    pub fn new(
        value: impl Into<String>,
        status_code: Option<u16>,
        redirect_to: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            node_type: "path".to_string(),
            status_code,
            redirect_to,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GeoIpData {
    #[serde(rename = "type")]
    pub node_type: String,
    pub network: Option<String>,
    pub asn: Option<u32>,
    pub asn_name: Option<String>,
    pub continent_name: Option<String>,
    pub continent_code: Option<String>,
    pub country_name: Option<String>,
    pub country_code: Option<String>,
}

impl GeoIpData {
    pub fn new() -> Self {
        Self {
            node_type: "geoip_data".to_string(),
            ..Default::default()
        }
    }
}

/// Root of the enrichment graph: one [`DomainNode`] per seed domain.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentGraph {
    pub domains: BTreeMap<String, DomainNode>,
}

impl EnrichmentGraph {
    pub fn new<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::default();
        for seed in seeds {
            let seed = seed.into();
            graph
                .domains
                .entry(seed.clone())
                .or_insert_with(|| DomainNode::new(seed));
        }
        graph
    }

    pub fn seed_hostnames(&self) -> Vec<String> {
        self.domains.keys().cloned().collect()
    }

    /// Every known hostname: seeds plus their discovered subdomains.
    pub fn hostnames(&self) -> Vec<String> {
        let mut all = Vec::new();
        for (hostname, node) in &self.domains {
            all.push(hostname.clone());
            all.extend(node.subdomains.keys().cloned());
        }
        all
    }

    /// Merges one provider's discovery into a seed's subdomain map.
    /// Idempotent: re-applying the same result neither duplicates nodes nor
    /// source tags.
    pub fn merge_discovery<I, S>(&mut self, seed: &str, source: &str, hostnames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Some(node) = self.domains.get_mut(seed) else {
            return;
        };
        for hostname in hostnames {
            let hostname = hostname.into();
            node.subdomains
                .entry(hostname.clone())
                .and_modify(|existing| {
                    existing.sources.insert(source.to_string());
                })
                .or_insert_with(|| DomainNode::with_source(hostname, source));
        }
    }

    /// Looks a hostname up among seeds and their subdomains.
    pub fn node_mut(&mut self, hostname: &str) -> Option<&mut DomainNode> {
        if self.domains.contains_key(hostname) {
            return self.domains.get_mut(hostname);
        }
        self.domains
            .values_mut()
            .find_map(|seed| seed.subdomains.get_mut(hostname))
    }

    /// Visits every seed node and every subdomain node, in order.
    pub fn for_each_node_mut<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut DomainNode),
    {
        for seed in self.domains.values_mut() {
            for sub in seed.subdomains.values_mut() {
                visit(sub);
            }
            visit(seed);
        }
    }

    /// The distinct IP addresses across the whole graph. Port scanning
    /// probes each physical IP exactly once, however many hostnames own it.
    pub fn distinct_ips(&self) -> BTreeSet<String> {
        let mut ips = BTreeSet::new();
        for seed in self.domains.values() {
            ips.extend(seed.ip_addresses.keys().cloned());
            for sub in seed.subdomains.values() {
                ips.extend(sub.ip_addresses.keys().cloned());
            }
        }
        ips
    }

    /// Folds one port-scan run into the graph: every [`IpNode`] whose value
    /// appears in `open` receives the open-port set, wherever it lives.
    pub fn apply_open_ports(&mut self, open: &BTreeMap<String, Vec<u16>>) {
        self.for_each_node_mut(|node| {
            for (ip, ip_node) in node.ip_addresses.iter_mut() {
                if let Some(ports) = open.get(ip) {
                    ip_node.ports = ports
                        .iter()
                        .map(|&port| (port, PortNode::open(port)))
                        .collect();
                }
            }
        });
    }
}
