//! TCP port scanning across every resolved address.

use crate::config::RunConfig;
use crate::graph::EnrichmentGraph;
use crate::pipeline::{Stage, StageDescriptor};
use crate::stages::ProgressFactory;
use crate::wordlist;
use anyhow::{Context, Result};
use async_trait::async_trait;
use spyglass_engine::defaults::{self, TCP_CONNECT_TIMEOUT};
use spyglass_engine::tcp;
use spyglass_engine::{run_all, Limiter, ResultSink};
use std::collections::BTreeMap;
use tracing::info;

/// Connect-scans the configured port list against every distinct IP in the
/// graph. Each physical address is scanned once; the result is shared by
/// every hostname that owns it.
pub struct PortScanStage {
    progress: ProgressFactory,
    ports: Vec<u16>,
    limit: usize,
    ports_per_host: usize,
}

impl PortScanStage {
    pub fn new(progress: ProgressFactory) -> Self {
        Self {
            progress,
            ports: Vec::new(),
            limit: defaults::PORT_SCAN_LIMIT,
            ports_per_host: defaults::PORTS_PER_HOST,
        }
    }

    #[cfg(test)]
    pub fn with_ports(ports: Vec<u16>) -> Self {
        Self {
            progress: crate::stages::no_progress(),
            ports,
            limit: 16,
            ports_per_host: 8,
        }
    }
}

#[async_trait]
impl Stage for PortScanStage {
    fn name(&self) -> &'static str {
        "port-scan"
    }

    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor {
            essential: false,
            recommended: false,
            passive: false,
        }
    }

    fn setup(&mut self, config: &RunConfig) -> Result<()> {
        let entries = wordlist::load_ports(&config.ports_file).context("loading port list")?;
        self.ports = entries.into_iter().map(|(port, _)| port).collect();
        self.limit = config.port_limit;
        self.ports_per_host = config.ports_per_host;
        Ok(())
    }

    async fn run(&self, graph: &mut EnrichmentGraph) -> Result<()> {
        let ips: Vec<String> = graph.distinct_ips().into_iter().collect();
        if ips.is_empty() {
            info!("no resolved addresses, nothing to scan");
            return Ok(());
        }

        let progress = (self.progress)("scanning ports", ips.len());
        let limiter = Limiter::new(self.limit);
        let sink: ResultSink<(String, Vec<u16>)> = ResultSink::new();

        let ports = self.ports.clone();
        let per_host = self.ports_per_host;
        run_all(
            ips,
            |ip| {
                let ports = ports.clone();
                let limiter = limiter.clone();
                let sink = sink.clone();
                async move {
                    let open =
                        tcp::scan_host(&ip, &ports, per_host, &limiter, TCP_CONNECT_TIMEOUT).await;
                    if !open.is_empty() {
                        sink.push((ip, open)).await;
                    }
                }
            },
            progress,
        )
        .await;

        let open: BTreeMap<String, Vec<u16>> = sink.drain().await.into_iter().collect();
        info!(
            "{} of {} addresses have open ports",
            open.len(),
            graph.distinct_ips().len()
        );
        graph.apply_open_ports(&open);
        Ok(())
    }
}
