//! Tunables shared by the probing primitives. The ceilings here exist because
//! a single run can issue tens of thousands of remote operations; they bound
//! in-flight sockets, not total work.

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Ceiling on concurrent in-flight HTTP requests during a bruteforce phase.
pub const DEFAULT_CONNECTION_COUNT: usize = 100;

/// Ceiling on concurrent in-flight DNS queries during a resolution phase.
pub const DNS_LIMIT: usize = 10;

/// Ceiling on concurrent TCP connects during a port-scan phase.
pub const PORT_SCAN_LIMIT: usize = 64;

/// Ceiling on simultaneous connects against one host during a port scan.
pub const PORTS_PER_HOST: usize = 32;

/// Subdomain wordlists are resolved in sequential phases of this many
/// candidates; caps peak memory and socket count for very large lists.
pub const DNS_BATCH_SIZE: usize = 500;

/// At most this many shuffled nameservers are tried per hostname, before the
/// fixed public fallback.
pub const DNS_CANDIDATE_CAP: usize = 5;

/// Last-resort resolver appended after the shuffled candidates.
pub const FALLBACK_NAMESERVER: &str = "8.8.8.8";

pub const DNS_TIMEOUT: Duration = Duration::from_secs(5);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Transport-level retries per HTTP request. There is only one server, so
/// these retry the same endpoint, never a sibling.
pub const HTTP_TRANSPORT_RETRIES: usize = 1;

/// Status codes that count as a hit before wildcard suppression.
pub const DEFAULT_VALID_STATUS_CODES: [u16; 7] = [200, 204, 301, 302, 307, 401, 403];

/// Number of guaranteed-nonexistent paths probed in the wildcard baseline.
pub const WILDCARD_SAMPLE_COUNT: usize = 30;

/// Length of each random wildcard path segment.
pub const WILDCARD_SEGMENT_LEN: usize = 30;

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.14; rv:78.0) Gecko/20100101 Firefox/78.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_3) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/84.0.4147.105 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Random alphanumeric string for wildcard baseline path segments.
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_string_has_requested_length() {
        let s = random_string(30);
        assert_eq!(s.len(), 30);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn user_agent_comes_from_the_pool() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }
}
