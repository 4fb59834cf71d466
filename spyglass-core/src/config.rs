//! Run configuration: input file locations and concurrency ceilings.
//!
//! The CLI collects these before the pipeline starts; stages read them in
//! `setup`, where a missing or unreadable file is a configuration error
//! surfaced before any network activity begins.

use spyglass_engine::defaults;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Newline-delimited nameserver addresses.
    pub resolvers_file: PathBuf,
    /// Subdomain labels for bruteforcing.
    pub subdomain_wordlist: PathBuf,
    /// Tab-separated `port<TAB>description` list.
    pub ports_file: PathBuf,
    /// Tab-separated `path<TAB>description` list.
    pub sensitive_paths_file: PathBuf,
    /// Directory holding GeoLite2-Country.mmdb and GeoLite2-ASN.mmdb.
    pub mmdb_dir: PathBuf,

    pub http_limit: usize,
    pub dns_limit: usize,
    pub port_limit: usize,
    /// Ceiling on simultaneous connects against a single host during port
    /// scanning, to stay under remote intrusion-detection thresholds.
    pub ports_per_host: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            resolvers_file: PathBuf::from("data/resolvers.txt"),
            subdomain_wordlist: PathBuf::from("data/names.txt"),
            ports_file: PathBuf::from("data/ports.txt"),
            sensitive_paths_file: PathBuf::from("data/sensitive_paths.txt"),
            mmdb_dir: PathBuf::from("data/mmdb"),
            http_limit: defaults::DEFAULT_CONNECTION_COUNT,
            dns_limit: defaults::DNS_LIMIT,
            port_limit: defaults::PORT_SCAN_LIMIT,
            ports_per_host: defaults::PORTS_PER_HOST,
        }
    }
}
