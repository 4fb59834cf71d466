//! Live web-server probing over both plaintext and TLS.

use crate::config::RunConfig;
use crate::graph::EnrichmentGraph;
use crate::pipeline::{Stage, StageDescriptor};
use crate::stages::ProgressFactory;
use anyhow::Result;
use async_trait::async_trait;
use spyglass_engine::defaults;
use spyglass_engine::http::{HttpProber, LiveProbe};
use spyglass_engine::{run_all, Limiter, ResultSink};
use std::sync::Arc;
use tracing::info;

const SCHEMES: [&str; 2] = ["http", "https"];

/// Probes `http://` and `https://` for every known hostname and records
/// whether each answered, and with which status.
pub struct HttpProbeStage {
    progress: ProgressFactory,
    limit: usize,
}

impl HttpProbeStage {
    pub fn new(progress: ProgressFactory) -> Self {
        Self {
            progress,
            limit: defaults::DEFAULT_CONNECTION_COUNT,
        }
    }
}

#[async_trait]
impl Stage for HttpProbeStage {
    fn name(&self) -> &'static str {
        "http-probe"
    }

    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor {
            essential: false,
            recommended: true,
            passive: false,
        }
    }

    fn setup(&mut self, config: &RunConfig) -> Result<()> {
        self.limit = config.http_limit;
        Ok(())
    }

    async fn run(&self, graph: &mut EnrichmentGraph) -> Result<()> {
        let hostnames = graph.hostnames();
        let jobs: Vec<(String, &'static str)> = hostnames
            .iter()
            .flat_map(|hostname| SCHEMES.map(|scheme| (hostname.clone(), scheme)))
            .collect();

        let progress = (self.progress)("probing web servers", jobs.len());
        let prober = Arc::new(HttpProber::new()?);
        let limiter = Limiter::new(self.limit);
        let sink: ResultSink<(String, &'static str, LiveProbe)> = ResultSink::new();

        run_all(
            jobs,
            |(hostname, scheme)| {
                let prober = prober.clone();
                let limiter = limiter.clone();
                let sink = sink.clone();
                async move {
                    let url = format!("{}://{}", scheme, hostname);
                    let probe = {
                        let _permit = limiter.acquire().await;
                        prober.probe_live(url).await
                    };
                    sink.push((hostname, scheme, probe)).await;
                }
            },
            progress,
        )
        .await;

        let probes = sink.drain().await;
        let live = probes.iter().filter(|(_, _, probe)| probe.live).count();
        info!("{} of {} endpoints answered", live, probes.len());

        for (hostname, scheme, probe) in probes {
            if let Some(node) = graph.node_mut(&hostname) {
                node.web.insert(scheme.to_string(), probe);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::no_progress;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn both_schemes_are_recorded_per_hostname() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let host = server.uri().trim_start_matches("http://").to_string();

        let mut graph = EnrichmentGraph::new([host.clone()]);
        let stage = HttpProbeStage::new(no_progress());
        stage.run(&mut graph).await.unwrap();

        let node = &graph.domains[&host];
        assert!(node.web["http"].live);
        assert_eq!(node.web["http"].status_code, Some(200));
        // Nothing speaks TLS on that port.
        assert!(!node.web["https"].live);
    }
}
