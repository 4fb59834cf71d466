use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("spyglass")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("spyglass")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Run the full reconnaissance pipeline against one or more seed domains: \
                subdomain discovery, DNS resolution, geoip, web probing, port scanning and \
                sensitive path checks.",
                )
                .arg(
                    arg!(-d --"domain" <DOMAIN> ... "A seed domain to scan (repeatable)")
                        .required(false)
                        .conflicts_with("domains-file"),
                )
                .arg(
                    arg!(-H --"domains-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of seed domains")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("domain"),
                )
                .arg(
                    arg!(-y --"yes")
                        .required(false)
                        .help("Run headless: answer every stage prompt with its recommended default")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write the JSON snapshot to a file (default: stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-r --"resolvers" <PATH>)
                        .required(false)
                        .help("Newline-delimited nameserver list (default: data/resolvers.txt)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-w --"wordlist" <PATH>)
                        .required(false)
                        .help("Subdomain label wordlist (default: data/names.txt)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"ports-file" <PATH>)
                        .required(false)
                        .help("Tab-separated port list (default: data/ports.txt)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"paths-file" <PATH>)
                        .required(false)
                        .help("Tab-separated sensitive path list (default: data/sensitive_paths.txt)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"mmdb-dir" <PATH>)
                        .required(false)
                        .help("Directory holding the GeoLite2 databases (default: data/mmdb)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Concurrent HTTP connections")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(--"dns-threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Concurrent DNS queries")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"port-threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Concurrent TCP connects across the whole scan")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("64"),
                )
                .arg(
                    arg!(--"ports-per-host" <NUM>)
                        .required(false)
                        .help("Concurrent TCP connects against a single host")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("32"),
                )
                .arg(
                    arg!(--"virustotal-key" <KEY>)
                        .required(false)
                        .help("VirusTotal API key; enables the virustotal discovery provider"),
                ),
        )
        .subcommand(
            command!("discover")
                .about(
                    "Passively discover subdomains of the seed domains from public OSINT \
                sources. No packet ever reaches the target.",
                )
                .arg(
                    arg!(-d --"domain" <DOMAIN> ... "A seed domain (repeatable)")
                        .required(false)
                        .conflicts_with("domains-file"),
                )
                .arg(
                    arg!(-H --"domains-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of seed domains")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("domain"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write the JSON snapshot to a file (default: stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"virustotal-key" <KEY>)
                        .required(false)
                        .help("VirusTotal API key; enables the virustotal discovery provider"),
                ),
        )
        .subcommand(
            command!("domainbust")
                .about(
                    "Bruteforce subdomains of a single domain by resolving every label in a \
                wordlist against a pool of nameservers.",
                )
                .arg(arg!(-d --"domain" <DOMAIN> "The domain to bruteforce").required(true))
                .arg(
                    arg!(-w --"wordlist" <PATH>)
                        .required(false)
                        .help("Subdomain label wordlist (default: data/names.txt)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-r --"resolvers" <PATH>)
                        .required(false)
                        .help("Newline-delimited nameserver list (default: data/resolvers.txt)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Concurrent DNS queries")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                ),
        )
        .subcommand(
            command!("dirbust")
                .about(
                    "Bruteforce paths on a single web server with a wordlist, suppressing \
                wildcard responses.",
                )
                .arg(
                    arg!(-u --"url" <URL> "The base URL to bust")
                        .required(true)
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-w --"wordlist" <PATH> "Path wordlist")
                        .required(true)
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-s --"status-codes" <CODES>)
                        .required(false)
                        .help("Comma-separated list of status codes to report (default: 200,204,301,302,307,401,403)"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Concurrent HTTP connections")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                ),
        )
}
