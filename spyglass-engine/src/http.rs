//! HTTP existence probing and path bruteforce.
//!
//! Two clients back this module: one with redirects disabled (a redirect
//! would mask the true status of a probed path) and one that follows them,
//! used only to resolve where a sensitive path ultimately lands. TLS
//! verification is off for both: the targets are arbitrary third-party hosts
//! whose certificates are not expected to validate, and the goal is
//! reachability, not trust.

use crate::defaults::{
    random_string, random_user_agent, DEFAULT_VALID_STATUS_CODES, HTTP_TIMEOUT,
    HTTP_TRANSPORT_RETRIES, WILDCARD_SAMPLE_COUNT, WILDCARD_SEGMENT_LEN,
};
use crate::engine::{run_all, Limiter, ProgressFn, ResultSink};
use crate::error::Result;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A bruteforce hit: probed URL and the status that made it a hit.
pub type PathHit = (String, u16);

/// Outcome of a single live/https existence probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveProbe {
    pub live: bool,
    pub status_code: Option<u16>,
    pub url: String,
}

pub struct HttpProber {
    client: Client,
    follower: Client,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        Self::with_timeout(HTTP_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        let follower = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self { client, follower })
    }

    /// One GET with a randomized User-Agent and a small transport-level
    /// retry budget. Transport errors and timeouts are swallowed; absence of
    /// a status is the failure signal.
    async fn get_status(&self, url: &str) -> Option<u16> {
        for attempt in 0..=HTTP_TRANSPORT_RETRIES {
            match self
                .client
                .get(url)
                .header(USER_AGENT, random_user_agent())
                .send()
                .await
            {
                Ok(response) => return Some(response.status().as_u16()),
                Err(e) => {
                    debug!("request failed for {} (attempt {}): {}", url, attempt + 1, e);
                }
            }
        }
        None
    }

    /// Probes one URL and records `(url, status)` when the status is in the
    /// accepted set.
    pub async fn fetch_path(
        &self,
        url: String,
        accepted: &HashSet<u16>,
        limiter: &Limiter,
        sink: &ResultSink<PathHit>,
    ) {
        let status = {
            let _permit = limiter.acquire().await;
            self.get_status(&url).await
        };

        if let Some(status) = status {
            if accepted.contains(&status) {
                info!("found: {} - {}", url, status);
                sink.push((url, status)).await;
            }
        }
    }

    /// Probes the base URL with guaranteed-nonexistent random paths. Any
    /// status that registers is a wildcard: the server answers every path
    /// with it, and it must not count as a hit in the real pass.
    pub async fn wildcard_status_codes(
        self: &Arc<Self>,
        base_url: &str,
        accepted: &HashSet<u16>,
        limiter: &Limiter,
    ) -> HashSet<u16> {
        let sink: ResultSink<PathHit> = ResultSink::new();
        let accepted = Arc::new(accepted.clone());

        let urls: Vec<String> = (0..WILDCARD_SAMPLE_COUNT)
            .map(|_| append_dir(base_url, &random_string(WILDCARD_SEGMENT_LEN)))
            .collect();

        run_all(
            urls,
            |url| {
                let prober = self.clone();
                let accepted = accepted.clone();
                let limiter = limiter.clone();
                let sink = sink.clone();
                async move {
                    prober.fetch_path(url, &accepted, &limiter, &sink).await;
                }
            },
            None,
        )
        .await;

        sink.drain().await.into_iter().map(|(_, s)| s).collect()
    }

    /// Full directory bruteforce: wildcard baseline first, then every
    /// wordlist candidate against the reduced accepted set. Both passes
    /// share one limiter.
    pub async fn bruteforce_paths(
        self: &Arc<Self>,
        base_url: &str,
        words: Vec<String>,
        accepted: Option<Vec<u16>>,
        limit: usize,
        progress: Option<ProgressFn>,
    ) -> Vec<PathHit> {
        let limiter = Limiter::new(limit);
        let mut accepted: HashSet<u16> = accepted
            .unwrap_or_else(|| DEFAULT_VALID_STATUS_CODES.to_vec())
            .into_iter()
            .collect();

        let wildcard = self
            .wildcard_status_codes(base_url, &accepted, &limiter)
            .await;
        if !wildcard.is_empty() {
            warn!(
                "wildcard status codes {:?} detected for {}, removing from accepted set",
                wildcard, base_url
            );
            accepted.retain(|code| !wildcard.contains(code));
        }

        let accepted = Arc::new(accepted);
        let sink: ResultSink<PathHit> = ResultSink::new();
        let urls: Vec<String> = words
            .iter()
            .map(|word| append_dir(base_url, word))
            .collect();

        run_all(
            urls,
            |url| {
                let prober = self.clone();
                let accepted = accepted.clone();
                let limiter = limiter.clone();
                let sink = sink.clone();
                async move {
                    prober.fetch_path(url, &accepted, &limiter, &sink).await;
                }
            },
            progress,
        )
        .await;

        sink.drain().await
    }

    /// Single reachability probe against one scheme://host URL, redirects
    /// disabled.
    pub async fn probe_live(&self, url: String) -> LiveProbe {
        let mut probe = LiveProbe {
            live: false,
            status_code: None,
            url: url.clone(),
        };

        match self
            .client
            .get(&url)
            .header(USER_AGENT, random_user_agent())
            .send()
            .await
        {
            Ok(response) => {
                probe.live = true;
                probe.status_code = Some(response.status().as_u16());
            }
            Err(e) => {
                debug!("probe failed for {}: {}", url, e);
            }
        }

        probe
    }

    /// GET that follows redirects, returning the final status and the URL it
    /// resolved to. Used to fill `redirect_to` for sensitive paths.
    pub async fn fetch_following(&self, url: &str) -> Option<(u16, String)> {
        let response = self
            .follower
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .send()
            .await
            .ok()?;
        Some((response.status().as_u16(), response.url().to_string()))
    }
}

/// Joins a base URL and a path candidate with exactly one slash.
pub fn append_dir(base_url: &str, dir: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{}/{}", base, dir.trim().trim_start_matches('/'))
}
