//! Resilient multi-nameserver DNS resolution.
//!
//! A hostname is resolved by walking a shuffled subset of candidate
//! nameservers, classifying each outcome as definitive (NXDOMAIN), usable
//! (addresses) or this-server-only (no answer, refused, timeout). The query
//! itself sits behind [`NameserverClient`] so the retry state machine can be
//! exercised without sockets.

use crate::defaults::{DNS_BATCH_SIZE, DNS_CANDIDATE_CAP, DNS_TIMEOUT, FALLBACK_NAMESERVER};
use crate::engine::{run_all, Limiter, ProgressFn, ResultSink};
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A successful resolution: hostname plus its IPv4 addresses. Absence of an
/// entry in the sink is the failure signal; no error is surfaced.
pub type DnsRecord = (String, Vec<String>);

/// One classified A-record query outcome against a single nameserver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// At least one address came back.
    Answered(Vec<String>),
    /// Authoritative negative; no other nameserver will disagree.
    NxDomain,
    /// This nameserver had nothing useful (empty answer, refusal, bad label).
    NoAnswer,
    /// The attempt timed out; transient, try the next candidate.
    TimedOut,
}

#[async_trait]
pub trait NameserverClient: Send + Sync {
    /// Issues one A query for `hostname` against `nameserver` and classifies
    /// the result. Must not retry internally.
    async fn query_a(&self, nameserver: &str, hostname: &str) -> QueryOutcome;
}

/// Production client: one single-nameserver UDP resolver per candidate,
/// built lazily and cached for the lifetime of the phase.
pub struct UdpNameserverClient {
    resolvers: Mutex<HashMap<String, Arc<TokioAsyncResolver>>>,
}

impl UdpNameserverClient {
    pub fn new() -> Self {
        Self {
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    fn resolver_for(&self, nameserver: &str) -> Option<Arc<TokioAsyncResolver>> {
        let mut cache = self.resolvers.lock().expect("resolver cache poisoned");
        if let Some(resolver) = cache.get(nameserver) {
            return Some(resolver.clone());
        }

        let with_port = if nameserver.contains(':') {
            nameserver.to_string()
        } else {
            format!("{}:53", nameserver)
        };
        let socket_addr: SocketAddr = match with_port.parse() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("skipping unparseable nameserver {}: {}", nameserver, e);
                return None;
            }
        };

        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig {
            socket_addr,
            protocol: Protocol::Udp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });

        let mut opts = ResolverOpts::default();
        opts.timeout = DNS_TIMEOUT;
        opts.attempts = 1;
        opts.use_hosts_file = false;
        opts.cache_size = 0;
        opts.try_tcp_on_error = false;

        let resolver = Arc::new(TokioAsyncResolver::tokio(config, opts));
        cache.insert(nameserver.to_string(), resolver.clone());
        Some(resolver)
    }
}

impl Default for UdpNameserverClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameserverClient for UdpNameserverClient {
    async fn query_a(&self, nameserver: &str, hostname: &str) -> QueryOutcome {
        let resolver = match self.resolver_for(nameserver) {
            Some(resolver) => resolver,
            None => return QueryOutcome::NoAnswer,
        };

        match resolver.ipv4_lookup(hostname).await {
            Ok(lookup) => {
                let addresses: Vec<String> = lookup.iter().map(|a| a.0.to_string()).collect();
                if addresses.is_empty() {
                    QueryOutcome::NoAnswer
                } else {
                    QueryOutcome::Answered(addresses)
                }
            }
            Err(err) => match err.kind() {
                ResolveErrorKind::NoRecordsFound { response_code, .. }
                    if *response_code == ResponseCode::NXDomain =>
                {
                    QueryOutcome::NxDomain
                }
                ResolveErrorKind::NoRecordsFound { .. } => QueryOutcome::NoAnswer,
                ResolveErrorKind::Timeout => QueryOutcome::TimedOut,
                _ => QueryOutcome::NoAnswer,
            },
        }
    }
}

/// Walks candidate nameservers for each hostname, spreading load by
/// shuffling and capping the candidate list.
pub struct DnsResolver<C = UdpNameserverClient> {
    client: C,
    nameservers: Vec<String>,
}

impl DnsResolver<UdpNameserverClient> {
    pub fn new(nameservers: Vec<String>) -> Self {
        Self::with_client(nameservers, UdpNameserverClient::new())
    }
}

impl<C: NameserverClient> DnsResolver<C> {
    pub fn with_client(nameservers: Vec<String>, client: C) -> Self {
        Self {
            client,
            nameservers,
        }
    }

    /// Resolves one hostname. On success the record lands in `sink`; every
    /// other outcome leaves the sink untouched.
    pub async fn resolve(&self, hostname: &str, limiter: &Limiter, sink: &ResultSink<DnsRecord>) {
        let mut candidates: Vec<String> = self.nameservers.clone();
        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(DNS_CANDIDATE_CAP);
        candidates.push(FALLBACK_NAMESERVER.to_string());

        for nameserver in &candidates {
            let permit = limiter.acquire().await;
            let outcome = self.client.query_a(nameserver, hostname).await;
            drop(permit);

            match outcome {
                QueryOutcome::Answered(addresses) => {
                    info!("found: {}", hostname);
                    sink.push((hostname.to_string(), addresses)).await;
                    return;
                }
                QueryOutcome::NxDomain => {
                    debug!("{}: NXDOMAIN, stopping", hostname);
                    return;
                }
                QueryOutcome::NoAnswer => {
                    debug!("{}: no answer from {}", hostname, nameserver);
                }
                QueryOutcome::TimedOut => {
                    debug!("{}: timeout against {}", hostname, nameserver);
                }
            }
        }
    }
}

/// Builds `<label>.<domain>` for a wordlist candidate.
pub fn append_subdomain(domain: &str, label: &str) -> String {
    format!("{}.{}", label.trim(), domain.trim())
}

/// Resolves `<label>.<domain>` for every wordlist label, in sequential
/// batches of [`DNS_BATCH_SIZE`] so very large lists never schedule the whole
/// wordlist at once. Returns every hostname that resolved.
pub async fn bruteforce_subdomains<C>(
    domain: &str,
    labels: Vec<String>,
    resolver: Arc<DnsResolver<C>>,
    limit: usize,
    progress: Option<ProgressFn>,
) -> Vec<DnsRecord>
where
    C: NameserverClient + 'static,
{
    let limiter = Limiter::new(limit);
    let sink: ResultSink<DnsRecord> = ResultSink::new();

    for batch in labels.chunks(DNS_BATCH_SIZE) {
        let hostnames: Vec<String> = batch
            .iter()
            .map(|label| append_subdomain(domain, label))
            .collect();

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
            progress.clone(),
        )
        .await;
    }

    sink.drain().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns pre-scripted outcomes in call order, recording each attempt.
    struct ScriptedClient {
        outcomes: Mutex<VecDeque<QueryOutcome>>,
        attempts: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(outcomes: Vec<QueryOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                attempts: AtomicUsize::new(0),
            }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NameserverClient for ScriptedClient {
        async fn query_a(&self, _nameserver: &str, _hostname: &str) -> QueryOutcome {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(QueryOutcome::NoAnswer)
        }
    }

    fn nameservers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("10.0.0.{}", i + 1)).collect()
    }

    /// An authoritative negative stops the walk after a single attempt.
    #[tokio::test]
    async fn nxdomain_stops_after_one_attempt() {
        let client = ScriptedClient::new(vec![QueryOutcome::NxDomain]);
        let resolver = DnsResolver::with_client(nameservers(8), client);
        let limiter = Limiter::new(4);
        let sink = ResultSink::new();

        resolver.resolve("gone.example.com", &limiter, &sink).await;

        assert_eq!(resolver.client.attempts(), 1);
        assert!(sink.is_empty().await);
    }

    /// Two transient timeouts fall through to the third candidate, which
    /// answers; no further candidates are attempted.
    #[tokio::test]
    async fn timeouts_fall_back_to_the_next_candidate() {
        let client = ScriptedClient::new(vec![
            QueryOutcome::TimedOut,
            QueryOutcome::TimedOut,
            QueryOutcome::Answered(vec!["1.2.3.4".to_string()]),
        ]);
        let resolver = DnsResolver::with_client(nameservers(8), client);
        let limiter = Limiter::new(4);
        let sink = ResultSink::new();

        resolver.resolve("www.example.com", &limiter, &sink).await;

        assert_eq!(resolver.client.attempts(), 3);
        let records = sink.drain().await;
        assert_eq!(
            records,
            vec![("www.example.com".to_string(), vec!["1.2.3.4".to_string()])]
        );
    }

    /// Exhaustion is capped at five shuffled candidates plus the fixed
    /// fallback, and leaves the sink empty.
    #[tokio::test]
    async fn candidate_walk_is_capped_and_failure_is_silent() {
        let client = ScriptedClient::new(Vec::new());
        let resolver = DnsResolver::with_client(nameservers(20), client);
        let limiter = Limiter::new(4);
        let sink: ResultSink<DnsRecord> = ResultSink::new();

        resolver.resolve("dark.example.com", &limiter, &sink).await;

        assert_eq!(resolver.client.attempts(), DNS_CANDIDATE_CAP + 1);
        assert!(sink.is_empty().await);
    }

    #[tokio::test]
    async fn bruteforce_collects_only_resolved_hostnames() {
        // One answer, then silence for everything else.
        let client = ScriptedClient::new(vec![QueryOutcome::Answered(vec![
            "9.9.9.9".to_string(),
        ])]);
        let resolver = Arc::new(DnsResolver::with_client(nameservers(2), client));

        let labels = vec!["www".to_string()];
        let records = bruteforce_subdomains("example.com", labels, resolver, 4, None).await;

        assert_eq!(
            records,
            vec![("www.example.com".to_string(), vec!["9.9.9.9".to_string()])]
        );
    }

    #[test]
    fn append_subdomain_trims_whitespace() {
        assert_eq!(append_subdomain("example.com\n", " www "), "www.example.com");
    }
}
