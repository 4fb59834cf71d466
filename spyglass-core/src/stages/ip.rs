//! IP enrichment: hostname resolution and offline geolocation.

use crate::config::RunConfig;
use crate::geoip::{GeoIpLookup, MaxMindLookup};
use crate::graph::{EnrichmentGraph, IpNode};
use crate::pipeline::{Stage, StageDescriptor};
use crate::stages::ProgressFactory;
use crate::wordlist;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use spyglass_engine::defaults;
use spyglass_engine::dns::{DnsRecord, DnsResolver};
use spyglass_engine::{run_all, Limiter, ResultSink};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves every known hostname to its IPv4 addresses. A fresh resolution
/// replaces whatever an earlier stage recorded for that hostname.
pub struct IpResolutionStage {
    progress: ProgressFactory,
    nameservers: Vec<String>,
    limit: usize,
}

impl IpResolutionStage {
    pub fn new(progress: ProgressFactory) -> Self {
        Self {
            progress,
            nameservers: Vec::new(),
            limit: defaults::DNS_LIMIT,
        }
    }
}

#[async_trait]
impl Stage for IpResolutionStage {
    fn name(&self) -> &'static str {
        "ip-resolution"
    }

    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor {
            essential: false,
            recommended: true,
            passive: true,
        }
    }

    fn setup(&mut self, config: &RunConfig) -> Result<()> {
        self.nameservers =
            wordlist::load_lines(&config.resolvers_file).context("loading nameserver list")?;
        self.limit = config.dns_limit;
        Ok(())
    }

    async fn run(&self, graph: &mut EnrichmentGraph) -> Result<()> {
        let hostnames = graph.hostnames();
        let progress = (self.progress)("resolving hostnames", hostnames.len());

        let resolver = Arc::new(DnsResolver::new(self.nameservers.clone()));
        let limiter = Limiter::new(self.limit);
        let sink: ResultSink<DnsRecord> = ResultSink::new();

        run_all(
            hostnames,
            |hostname| {
                let resolver = resolver.clone();
                let limiter = limiter.clone();
                let sink = sink.clone();
                async move {
                    resolver.resolve(&hostname, &limiter, &sink).await;
                }
            },
            progress,
        )
        .await;

        let records = sink.drain().await;
        info!("{} hostnames resolved", records.len());

        for (hostname, addresses) in records {
            if let Some(node) = graph.node_mut(&hostname) {
                node.ip_addresses = addresses
                    .into_iter()
                    .map(|address| (address.clone(), IpNode::new(address)))
                    .collect();
            }
        }
        Ok(())
    }
}

/// Annotates every resolved IP with country, continent and ASN data from
/// local GeoLite2 databases.
pub struct GeoIpStage {
    lookup: Option<Box<dyn GeoIpLookup>>,
}

impl GeoIpStage {
    pub fn new() -> Self {
        Self { lookup: None }
    }

    #[cfg(test)]
    pub fn with_lookup(lookup: Box<dyn GeoIpLookup>) -> Self {
        Self {
            lookup: Some(lookup),
        }
    }
}

impl Default for GeoIpStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for GeoIpStage {
    fn name(&self) -> &'static str {
        "geoip"
    }

    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor {
            essential: false,
            recommended: true,
            passive: true,
        }
    }

    fn setup(&mut self, config: &RunConfig) -> Result<()> {
        if self.lookup.is_none() {
            self.lookup = Some(Box::new(MaxMindLookup::open(&config.mmdb_dir)?));
        }
        Ok(())
    }

    async fn run(&self, graph: &mut EnrichmentGraph) -> Result<()> {
        let Some(lookup) = self.lookup.as_deref() else {
            bail!("geoip databases were never opened");
        };

        let mut annotated = 0usize;
        graph.for_each_node_mut(|node| {
            for (address, ip_node) in node.ip_addresses.iter_mut() {
                if ip_node.geo_ip.is_some() {
                    continue;
                }
                let Ok(ip) = address.parse::<IpAddr>() else {
                    debug!("unparseable address {}", address);
                    continue;
                };
                ip_node.geo_ip = lookup.lookup(ip);
                if ip_node.geo_ip.is_some() {
                    annotated += 1;
                }
            }
        });

        info!("{} addresses annotated", annotated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GeoIpData;

    struct FixedLookup;

    impl GeoIpLookup for FixedLookup {
        fn lookup(&self, ip: IpAddr) -> Option<GeoIpData> {
            let mut data = GeoIpData::new();
            data.country_code = Some("DE".to_string());
            data.network = Some(format!("{}/32", ip));
            Some(data)
        }
    }

    #[tokio::test]
    async fn every_resolved_address_gets_annotated() {
        let mut graph = EnrichmentGraph::new(["example.com"]);
        graph.merge_discovery("example.com", "fixed", ["www.example.com".to_string()]);
        graph
            .node_mut("www.example.com")
            .unwrap()
            .ip_addresses
            .insert("1.2.3.4".to_string(), IpNode::new("1.2.3.4"));

        let stage = GeoIpStage::with_lookup(Box::new(FixedLookup));
        stage.run(&mut graph).await.unwrap();

        let node = graph.node_mut("www.example.com").unwrap();
        let geo = node.ip_addresses["1.2.3.4"].geo_ip.as_ref().unwrap();
        assert_eq!(geo.country_code.as_deref(), Some("DE"));
        assert_eq!(geo.network.as_deref(), Some("1.2.3.4/32"));
    }
}
