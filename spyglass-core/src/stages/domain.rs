//! Subdomain gathering: passive OSINT discovery and active DNS bruteforce.

use crate::config::RunConfig;
use crate::discovery::{self, Provider};
use crate::graph::{EnrichmentGraph, IpNode};
use crate::pipeline::{Stage, StageDescriptor};
use crate::stages::ProgressFactory;
use crate::wordlist;
use anyhow::{Context, Result};
use async_trait::async_trait;
use spyglass_engine::defaults;
use spyglass_engine::dns::{bruteforce_subdomains, DnsResolver};
use std::sync::Arc;
use tracing::info;

/// Queries public OSINT services for known subdomains of every seed.
/// Essential: everything downstream enriches what this stage finds.
pub struct SubdomainDiscoveryStage {
    progress: ProgressFactory,
    providers: Vec<Arc<dyn Provider>>,
    limit: usize,
}

impl SubdomainDiscoveryStage {
    pub fn new(progress: ProgressFactory, virustotal_key: Option<String>) -> Self {
        Self {
            progress,
            providers: discovery::default_providers(virustotal_key),
            limit: defaults::DEFAULT_CONNECTION_COUNT,
        }
    }

    #[cfg(test)]
    pub fn with_providers(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            progress: crate::stages::no_progress(),
            providers,
            limit: 8,
        }
    }
}

#[async_trait]
impl Stage for SubdomainDiscoveryStage {
    fn name(&self) -> &'static str {
        "subdomain-discovery"
    }

    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor {
            essential: true,
            recommended: true,
            passive: true,
        }
    }

    fn setup(&mut self, config: &RunConfig) -> Result<()> {
        self.limit = config.http_limit;
        Ok(())
    }

    async fn run(&self, graph: &mut EnrichmentGraph) -> Result<()> {
        let seeds = graph.seed_hostnames();
        let _progress = (self.progress)("discovering subdomains", seeds.len());

        let discoveries = discovery::discover_all(&seeds, &self.providers, self.limit).await;
        for discovery in discoveries {
            graph.merge_discovery(&discovery.seed, discovery.source, discovery.hostnames);
        }

        for seed in &seeds {
            if let Some(node) = graph.node_mut(seed) {
                info!("{}: {} subdomains known", seed, node.subdomains.len());
            }
        }
        Ok(())
    }
}

/// Resolves `<label>.<seed>` for every wordlist label against the configured
/// nameserver pool. Active and noisy, so off by default.
pub struct SubdomainBruteforceStage {
    progress: ProgressFactory,
    nameservers: Vec<String>,
    labels: Vec<String>,
    limit: usize,
}

impl SubdomainBruteforceStage {
    pub fn new(progress: ProgressFactory) -> Self {
        Self {
            progress,
            nameservers: Vec::new(),
            labels: Vec::new(),
            limit: defaults::DNS_LIMIT,
        }
    }
}

#[async_trait]
impl Stage for SubdomainBruteforceStage {
    fn name(&self) -> &'static str {
        "subdomain-bruteforce"
    }

    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor {
            essential: false,
            recommended: false,
            passive: false,
        }
    }

    fn setup(&mut self, config: &RunConfig) -> Result<()> {
        self.nameservers =
            wordlist::load_lines(&config.resolvers_file).context("loading nameserver list")?;
        self.labels =
            wordlist::load_lines(&config.subdomain_wordlist).context("loading subdomain labels")?;
        self.limit = config.dns_limit;
        Ok(())
    }

    async fn run(&self, graph: &mut EnrichmentGraph) -> Result<()> {
        let resolver = Arc::new(DnsResolver::new(self.nameservers.clone()));

        for seed in graph.seed_hostnames() {
            let progress = (self.progress)(&format!("bruteforcing {}", seed), self.labels.len());
            let records = bruteforce_subdomains(
                &seed,
                self.labels.clone(),
                resolver.clone(),
                self.limit,
                progress,
            )
            .await;

            info!("{}: {} labels resolved", seed, records.len());
            graph.merge_discovery(
                &seed,
                "bruteforce",
                records.iter().map(|(hostname, _)| hostname.clone()),
            );
            // Bruteforce already resolved these, keep the addresses.
            for (hostname, addresses) in records {
                if let Some(node) = graph.node_mut(&hostname) {
                    for address in addresses {
                        node.ip_addresses
                            .entry(address.clone())
                            .or_insert_with(|| IpNode::new(address));
                    }
                }
            }
        }
        Ok(())
    }
}
