//! Sensitive-path fetching against live web endpoints.

use crate::config::RunConfig;
use crate::graph::{EnrichmentGraph, PathNode};
use crate::pipeline::{Stage, StageDescriptor};
use crate::stages::ProgressFactory;
use crate::wordlist;
use anyhow::{Context, Result};
use async_trait::async_trait;
use spyglass_engine::defaults::{
    self, random_string, DEFAULT_VALID_STATUS_CODES, WILDCARD_SEGMENT_LEN,
};
use spyglass_engine::http::{append_dir, HttpProber, PathHit};
use spyglass_engine::{run_all, Limiter, ResultSink};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Checks a curated list of interesting paths (version-control leftovers,
/// admin panels, backup files) against every live web endpoint. A host that
/// answers a random nonexistent path with an accepted status is a wildcard
/// responder for that status; the status is dropped from that host's
/// accepted set and the pass continues, so genuine hits with other statuses
/// still surface.
pub struct SensitivePathStage {
    progress: ProgressFactory,
    paths: Vec<(String, String)>,
    limit: usize,
}

impl SensitivePathStage {
    pub fn new(progress: ProgressFactory) -> Self {
        Self {
            progress,
            paths: Vec::new(),
            limit: defaults::DEFAULT_CONNECTION_COUNT,
        }
    }

    #[cfg(test)]
    pub fn with_paths(paths: Vec<(String, String)>) -> Self {
        Self {
            progress: crate::stages::no_progress(),
            paths,
            limit: 8,
        }
    }

    /// The base URL to probe for one hostname, preferring TLS. `None` when
    /// no scheme answered during the probe stage.
    fn live_base_url(node: &crate::graph::DomainNode) -> Option<String> {
        for scheme in ["https", "http"] {
            if let Some(probe) = node.web.get(scheme) {
                if probe.live {
                    return Some(probe.url.clone());
                }
            }
        }
        None
    }
}

#[async_trait]
impl Stage for SensitivePathStage {
    fn name(&self) -> &'static str {
        "sensitive-paths"
    }

    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor {
            essential: false,
            recommended: true,
            passive: false,
        }
    }

    fn setup(&mut self, config: &RunConfig) -> Result<()> {
        self.paths = wordlist::load_indexed(&config.sensitive_paths_file)
            .context("loading sensitive path list")?;
        self.limit = config.http_limit;
        Ok(())
    }

    async fn run(&self, graph: &mut EnrichmentGraph) -> Result<()> {
        let mut targets: Vec<(String, String)> = Vec::new();
        graph.for_each_node_mut(|node| {
            if let Some(base_url) = Self::live_base_url(node) {
                targets.push((node.value.clone(), base_url));
            }
        });
        if targets.is_empty() {
            info!("no live web endpoints, nothing to check");
            return Ok(());
        }

        let progress = (self.progress)("checking sensitive paths", targets.len());
        let prober = Arc::new(HttpProber::new()?);
        let limiter = Limiter::new(self.limit);
        let accepted: Arc<HashSet<u16>> =
            Arc::new(DEFAULT_VALID_STATUS_CODES.iter().copied().collect());
        let sink: ResultSink<(String, PathNode)> = ResultSink::new();

        let paths = Arc::new(self.paths.clone());
        run_all(
            targets,
            |(hostname, base_url)| {
                let prober = prober.clone();
                let limiter = limiter.clone();
                let accepted = accepted.clone();
                let paths = paths.clone();
                let sink = sink.clone();
                async move {
                    // One random path first. Any status it registers is a
                    // catch-all answer and cannot count as a hit here.
                    let canary: ResultSink<PathHit> = ResultSink::new();
                    let random_url = append_dir(&base_url, &random_string(WILDCARD_SEGMENT_LEN));
                    prober
                        .fetch_path(random_url, &accepted, &limiter, &canary)
                        .await;

                    let mut host_accepted = (*accepted).clone();
                    for (_, status) in canary.drain().await {
                        warn!(
                            "{} answers arbitrary paths with {}, ignoring that status",
                            hostname, status
                        );
                        host_accepted.remove(&status);
                    }

                    for (path, description) in paths.iter() {
                        let url = append_dir(&base_url, path);
                        let hits: ResultSink<PathHit> = ResultSink::new();
                        prober
                            .fetch_path(url.clone(), &host_accepted, &limiter, &hits)
                            .await;

                        for (hit_url, status) in hits.drain().await {
                            // Resolve where a redirecting path finally lands,
                            // recording the path component only.
                            let redirect_to = match prober.fetch_following(&hit_url).await {
                                Some((_, final_url)) if final_url != hit_url => {
                                    Url::parse(&final_url)
                                        .ok()
                                        .map(|parsed| parsed.path().to_string())
                                }
                                _ => None,
                            };
                            sink.push((
                                hostname.clone(),
                                PathNode::new(
                                    path.clone(),
                                    Some(status),
                                    redirect_to,
                                    description.clone(),
                                ),
                            ))
                            .await;
                        }
                    }
                }
            },
            progress,
        )
        .await;

        let found = sink.drain().await;
        info!("{} sensitive paths found", found.len());
        for (hostname, path_node) in found {
            if let Some(node) = graph.node_mut(&hostname) {
                node.paths.insert(path_node.value.clone(), path_node);
            }
        }
        Ok(())
    }
}
