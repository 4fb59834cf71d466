//! Passive subdomain discovery against public OSINT services.
//!
//! Each provider queries one service and returns the subdomains it knows
//! about for a seed domain. Providers are fallible by nature; a provider
//! that errors out contributes nothing and the run continues.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use spyglass_engine::defaults::{self, HTTP_TIMEOUT};
use spyglass_engine::{run_all, Limiter, ResultSink};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// The subdomains one provider reported for one seed domain.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub seed: String,
    pub source: &'static str,
    pub hostnames: BTreeSet<String>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn subdomains(&self, domain: &str) -> Result<BTreeSet<String>>;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(defaults::random_user_agent())
        .build()
        .unwrap_or_default()
}

/// Keeps only well-formed subdomains of `domain`: no wildcards, no mailbox
/// syntax, and never the seed itself.
fn keep_subdomain(candidate: &str, domain: &str) -> bool {
    candidate.ends_with(&format!(".{}", domain))
        && !candidate.contains('*')
        && !candidate.contains('@')
        && candidate != domain
}

// crt.sh

pub struct CrtShProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: String,
}

impl CrtShProvider {
    pub fn new() -> Self {
        Self::with_base_url("https://crt.sh")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into(),
        }
    }

    /// Certificate transparency entries carry newline-joined name lists.
    fn parse(entries: Vec<CrtShEntry>, domain: &str) -> BTreeSet<String> {
        entries
            .iter()
            .flat_map(|entry| entry.name_value.lines())
            .map(|name| name.trim().to_lowercase())
            .filter(|name| keep_subdomain(name, domain))
            .collect()
    }
}

impl Default for CrtShProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for CrtShProvider {
    fn name(&self) -> &'static str {
        "crtsh"
    }

    async fn subdomains(&self, domain: &str) -> Result<BTreeSet<String>> {
        let url = format!("{}/?q=%25.{}&output=json", self.base_url, domain);
        let entries: Vec<CrtShEntry> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("crt.sh returned a malformed response")?;
        Ok(Self::parse(entries, domain))
    }
}

// sublist3r

pub struct Sublist3rProvider {
    client: reqwest::Client,
    base_url: String,
}

impl Sublist3rProvider {
    pub fn new() -> Self {
        Self::with_base_url("https://api.sublist3r.com")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into(),
        }
    }
}

impl Default for Sublist3rProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for Sublist3rProvider {
    fn name(&self) -> &'static str {
        "sublist3r"
    }

    async fn subdomains(&self, domain: &str) -> Result<BTreeSet<String>> {
        let url = format!("{}/search.php?domain={}", self.base_url, domain);
        let names: Vec<String> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("sublist3r returned a malformed response")?;
        Ok(names
            .into_iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| keep_subdomain(name, domain))
            .collect())
    }
}

// threatcrowd

pub struct ThreatCrowdProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ThreatCrowdReport {
    subdomains: Option<Vec<String>>,
}

impl ThreatCrowdProvider {
    pub fn new() -> Self {
        Self::with_base_url("https://www.threatcrowd.org")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into(),
        }
    }
}

impl Default for ThreatCrowdProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for ThreatCrowdProvider {
    fn name(&self) -> &'static str {
        "threatcrowd"
    }

    async fn subdomains(&self, domain: &str) -> Result<BTreeSet<String>> {
        let url = format!(
            "{}/searchApi/v2/domain/report/?domain={}",
            self.base_url, domain
        );
        let report: ThreatCrowdReport = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("threatcrowd returned a malformed response")?;

        // The report omits the subdomains key when it has nothing.
        let Some(names) = report.subdomains else {
            debug!("threatcrowd has no subdomains for {}", domain);
            return Ok(BTreeSet::new());
        };
        Ok(names
            .into_iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| keep_subdomain(name, domain))
            .collect())
    }
}

// virustotal

pub struct VirusTotalProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct VirusTotalPage {
    data: Vec<VirusTotalEntry>,
    #[serde(default)]
    links: VirusTotalLinks,
}

#[derive(Debug, Deserialize)]
struct VirusTotalEntry {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct VirusTotalLinks {
    next: Option<String>,
}

impl VirusTotalProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url("https://www.virustotal.com", api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Provider for VirusTotalProvider {
    fn name(&self) -> &'static str {
        "virustotal"
    }

    async fn subdomains(&self, domain: &str) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let mut url = format!(
            "{}/api/v3/domains/{}/subdomains?limit=40",
            self.base_url, domain
        );

        loop {
            let page: VirusTotalPage = self
                .client
                .get(&url)
                .header("x-apikey", &self.api_key)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
                .context("virustotal returned a malformed response")?;

            names.extend(
                page.data
                    .into_iter()
                    .map(|entry| entry.id.trim().to_lowercase())
                    .filter(|name| keep_subdomain(name, domain)),
            );

            match page.links.next {
                Some(next) => url = next,
                None => break,
            }
        }

        Ok(names)
    }
}

/// The providers a run uses when nothing else is configured. VirusTotal
/// needs an API key, so it only joins when one is present.
pub fn default_providers(virustotal_key: Option<String>) -> Vec<Arc<dyn Provider>> {
    let mut providers: Vec<Arc<dyn Provider>> = vec![
        Arc::new(CrtShProvider::new()),
        Arc::new(Sublist3rProvider::new()),
        Arc::new(ThreatCrowdProvider::new()),
    ];
    if let Some(key) = virustotal_key {
        providers.push(Arc::new(VirusTotalProvider::new(key)));
    }
    providers
}

/// Queries every provider for every seed under one concurrency ceiling.
/// Provider failures are logged and dropped; whatever succeeded is kept.
pub async fn discover_all(
    seeds: &[String],
    providers: &[Arc<dyn Provider>],
    limit: usize,
) -> Vec<Discovery> {
    let limiter = Limiter::new(limit);
    let sink = ResultSink::new();

    let mut jobs = Vec::with_capacity(seeds.len() * providers.len());
    for seed in seeds {
        for provider in providers {
            jobs.push((seed.clone(), Arc::clone(provider)));
        }
    }

    run_all(
        jobs,
        |(seed, provider)| {
            let limiter = limiter.clone();
            let sink = sink.clone();
            async move {
                let _permit = limiter.acquire().await;
                match provider.subdomains(&seed).await {
                    Ok(hostnames) => {
                        debug!(
                            "{} found {} subdomains for {}",
                            provider.name(),
                            hostnames.len(),
                            seed
                        );
                        sink.push(Discovery {
                            seed,
                            source: provider.name(),
                            hostnames,
                        })
                        .await;
                    }
                    Err(e) => warn!("{} failed for {}: {:#}", provider.name(), seed, e),
                }
            }
        },
        None,
    )
    .await;

    sink.drain().await
}
