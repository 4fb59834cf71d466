use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use spyglass_core::discovery::{default_providers, discover_all};
use spyglass_core::export::export_snapshot;
use spyglass_core::stages::{full_run, ProgressFactory};
use spyglass_core::{
    assume_recommended, wordlist, ConfirmFn, EnrichmentGraph, Pipeline, RunConfig,
    StageDescriptor, StageState,
};
use spyglass_engine::dns::{bruteforce_subdomains, DnsResolver};
use spyglass_engine::http::HttpProber;
use spyglass_engine::ProgressFn;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

// Helper functions shared by the subcommand handlers

/// Load seed domains from either repeated --domain flags or a file
pub fn load_domains_from_source(
    domains: Vec<String>,
    domains_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(path) = domains_file {
        load_domains_from_file(path)
    } else if !domains.is_empty() {
        let parsed: Vec<String> = domains
            .iter()
            .filter_map(|d| parse_domain_line(d))
            .collect();
        if parsed.is_empty() {
            return Err("No valid domains given".to_string());
        }
        Ok(parsed)
    } else {
        Err("Either --domain or --domains-file must be provided".to_string())
    }
}

/// Load and parse seed domains from a newline-delimited file
pub fn load_domains_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read domains file {}: {}", path.display(), e))?;

    let domains: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_domain_line(line.trim()))
        .collect();

    if domains.is_empty() {
        return Err(format!("No valid domains found in {}", path.display()));
    }

    Ok(domains)
}

/// Parse a single line as a bare domain, stripping any scheme or path the
/// user pasted in and normalizing case and trailing dots
pub fn parse_domain_line(line: &str) -> Option<String> {
    let mut candidate = line.trim().to_lowercase();

    if candidate.contains("://") {
        candidate = Url::parse(&candidate)
            .ok()
            .and_then(|u| u.host_str().map(String::from))?;
    } else if let Some((host, _)) = candidate.split_once('/') {
        candidate = host.to_string();
    }

    let candidate = candidate.trim_end_matches('.').to_string();
    if candidate.is_empty() || candidate.contains(char::is_whitespace) || !candidate.contains('.') {
        eprintln!("⚠️  Skipping invalid domain '{}'", line);
        return None;
    }
    Some(candidate)
}

/// Parse a comma-separated status code list like "200,301,403"
pub fn parse_status_codes(raw: &str) -> Result<Vec<u16>, String> {
    let codes: Result<Vec<u16>, _> = raw
        .split(',')
        .map(|part| part.trim().parse::<u16>())
        .collect();
    let codes = codes.map_err(|e| format!("Invalid status code list '{}': {}", raw, e))?;
    if codes.is_empty() {
        return Err("Status code list is empty".to_string());
    }
    Ok(codes)
}

/// Expand a leading tilde in user-supplied paths
pub fn expand_path(path: &PathBuf) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush().unwrap();
    let mut response = String::new();
    io::stdin().read_line(&mut response).unwrap();
    response.trim().to_lowercase()
}

fn status_colored(status: u16) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        200..=299 => text.green(),
        300..=399 => text.cyan(),
        400..=499 => text.yellow(),
        _ => text.red(),
    }
}

/// One indicatif bar per pipeline phase, ticked once per finished work item
pub fn progress_bars() -> ProgressFactory {
    Arc::new(|label: &str, total: usize| {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:28} {wide_bar:.cyan} {pos}/{len}")
                .unwrap(),
        );
        pb.set_message(label.to_string());
        let callback: ProgressFn = Arc::new(move || pb.inc(1));
        Some(callback)
    })
}

/// Asks the operator before each optional stage, defaulting to the stage's
/// recommendation on an empty answer
pub fn interactive_confirm() -> ConfirmFn {
    Arc::new(|name: &str, descriptor: StageDescriptor| {
        let kind = if descriptor.passive {
            "passive".green()
        } else {
            "active".yellow()
        };
        let hint = if descriptor.recommended {
            "[Y/n]"
        } else {
            "[y/N]"
        };
        let response = print_prompt(&format!("Run {} stage '{}'? {}:", kind, name, hint));
        if response.is_empty() {
            descriptor.recommended
        } else {
            response == "y" || response == "yes"
        }
    })
}

/// Overlay file paths and worker counts from the CLI onto the defaults.
/// `try_get_one` because not every subcommand defines every knob.
fn run_config_from_args(sub_matches: &ArgMatches) -> RunConfig {
    fn path_arg(sub_matches: &ArgMatches, id: &str) -> Option<PathBuf> {
        sub_matches
            .try_get_one::<PathBuf>(id)
            .ok()
            .flatten()
            .map(expand_path)
    }
    fn count_arg(sub_matches: &ArgMatches, id: &str) -> Option<usize> {
        sub_matches.try_get_one::<usize>(id).ok().flatten().copied()
    }

    let mut config = RunConfig::default();
    if let Some(path) = path_arg(sub_matches, "resolvers") {
        config.resolvers_file = path;
    }
    if let Some(path) = path_arg(sub_matches, "wordlist") {
        config.subdomain_wordlist = path;
    }
    if let Some(path) = path_arg(sub_matches, "ports-file") {
        config.ports_file = path;
    }
    if let Some(path) = path_arg(sub_matches, "paths-file") {
        config.sensitive_paths_file = path;
    }
    if let Some(path) = path_arg(sub_matches, "mmdb-dir") {
        config.mmdb_dir = path;
    }
    if let Some(threads) = count_arg(sub_matches, "threads") {
        config.http_limit = threads;
    }
    if let Some(threads) = count_arg(sub_matches, "dns-threads") {
        config.dns_limit = threads;
    }
    if let Some(threads) = count_arg(sub_matches, "port-threads") {
        config.port_limit = threads;
    }
    if let Some(per_host) = count_arg(sub_matches, "ports-per-host") {
        config.ports_per_host = per_host;
    }
    config
}

fn seeds_from_args(sub_matches: &ArgMatches) -> Vec<String> {
    let domains: Vec<String> = sub_matches
        .get_many::<String>("domain")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let domains_file = sub_matches.get_one::<PathBuf>("domains-file");

    match load_domains_from_source(domains, domains_file) {
        Ok(seeds) => seeds,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    }
}

pub async fn handle_scan(sub_matches: &ArgMatches) {
    let seeds = seeds_from_args(sub_matches);
    let config = run_config_from_args(sub_matches);
    let headless = sub_matches.get_flag("yes");
    let virustotal_key = sub_matches.get_one::<String>("virustotal-key").cloned();
    let output = sub_matches.get_one::<PathBuf>("output").map(expand_path);

    print_divider();
    println!("{}", "  SPYGLASS SCAN".bright_white().bold());
    print_divider();
    println!();
    println!("{} Seeds: {}", "→".blue(), seeds.join(", ").bright_white());
    println!(
        "{} Workers: {} http / {} dns / {} tcp",
        "→".blue(),
        config.http_limit.to_string().cyan(),
        config.dns_limit.to_string().cyan(),
        config.port_limit.to_string().cyan()
    );
    println!();

    let confirm = if headless {
        assume_recommended()
    } else {
        interactive_confirm()
    };

    let mut graph = EnrichmentGraph::new(seeds);
    let mut pipeline = Pipeline::new(confirm);
    for stage in full_run(progress_bars(), virustotal_key) {
        pipeline = pipeline.with_stage(stage);
    }

    let reports = match pipeline.run(&mut graph, &config).await {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("✗ Scan failed: {:#}", e);
            std::process::exit(1);
        }
    };

    println!();
    print_divider();
    println!("{}", "  SCAN COMPLETE".green().bold());
    print_divider();
    for report in &reports {
        let state = match report.state {
            StageState::Done => "done".green(),
            StageState::Skipped => "skipped".blue(),
            StageState::Failed => "failed".red(),
            _ => "pending".white(),
        };
        println!("  {} {:24} {}", "•".blue(), report.name, state);
    }
    println!();

    if let Err(e) = export_snapshot(&graph, output.as_deref()) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
    if let Some(path) = output {
        println!(
            "{} Snapshot written to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }
}

pub async fn handle_discover(sub_matches: &ArgMatches) {
    let seeds = seeds_from_args(sub_matches);
    let virustotal_key = sub_matches.get_one::<String>("virustotal-key").cloned();
    let output = sub_matches.get_one::<PathBuf>("output").map(expand_path);

    println!("\n🔭 Discovering subdomains of {} seed(s)\n", seeds.len());

    let providers = default_providers(virustotal_key);
    let mut graph = EnrichmentGraph::new(seeds);
    let discoveries = discover_all(
        &graph.seed_hostnames(),
        &providers,
        spyglass_engine::defaults::DEFAULT_CONNECTION_COUNT,
    )
    .await;

    for discovery in discoveries {
        println!(
            "{} {} reported {} subdomains for {}",
            "✓".green().bold(),
            discovery.source.bright_white(),
            discovery.hostnames.len().to_string().cyan(),
            discovery.seed
        );
        graph.merge_discovery(&discovery.seed, discovery.source, discovery.hostnames);
    }

    println!();
    for (seed, node) in &graph.domains {
        println!("  {}", seed.bright_white().bold());
        for subdomain in node.subdomains.keys() {
            println!("    {} {}", "•".blue(), subdomain);
        }
    }
    println!();

    if let Err(e) = export_snapshot(&graph, output.as_deref()) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

pub async fn handle_domainbust(sub_matches: &ArgMatches) {
    let domain = match parse_domain_line(sub_matches.get_one::<String>("domain").unwrap()) {
        Some(domain) => domain,
        None => std::process::exit(1),
    };
    let threads = *sub_matches.get_one::<usize>("threads").unwrap_or(&10);
    let config = run_config_from_args(sub_matches);

    let nameservers = match wordlist::load_lines(&config.resolvers_file) {
        Ok(nameservers) => nameservers,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            std::process::exit(1);
        }
    };
    let labels = match wordlist::load_lines(&config.subdomain_wordlist) {
        Ok(labels) => labels,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            std::process::exit(1);
        }
    };

    println!(
        "\n🔭 Bruteforcing {} with {} labels against {} nameservers\n",
        domain.bright_white().bold(),
        labels.len().to_string().cyan(),
        nameservers.len().to_string().cyan()
    );

    let progress = progress_bars()(&format!("bruteforcing {}", domain), labels.len());
    let resolver = Arc::new(DnsResolver::new(nameservers));
    let mut records = bruteforce_subdomains(&domain, labels, resolver, threads, progress).await;
    records.sort();

    println!();
    for (hostname, addresses) in &records {
        println!(
            "{} {} {}",
            "✓".green().bold(),
            hostname.bright_white(),
            addresses.join(", ").cyan()
        );
    }
    println!(
        "\n{} {} subdomains resolved\n",
        "✓".green().bold(),
        records.len().to_string().cyan()
    );
}

pub async fn handle_dirbust(sub_matches: &ArgMatches) {
    let url = sub_matches.get_one::<Url>("url").unwrap();
    let wordlist_file = expand_path(sub_matches.get_one::<PathBuf>("wordlist").unwrap());
    let threads = *sub_matches.get_one::<usize>("threads").unwrap_or(&100);

    let accepted = match sub_matches.get_one::<String>("status-codes") {
        Some(raw) => match parse_status_codes(raw) {
            Ok(codes) => Some(codes),
            Err(e) => {
                eprintln!("✗ {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let words = match wordlist::load_lines(&wordlist_file) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            std::process::exit(1);
        }
    };

    println!(
        "\n🔭 Busting {} with {} paths\n",
        url.as_str().bright_white().bold(),
        words.len().to_string().cyan()
    );

    let prober = match HttpProber::new() {
        Ok(prober) => Arc::new(prober),
        Err(e) => {
            eprintln!("✗ Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let progress = progress_bars()("busting paths", words.len());
    let mut hits = prober
        .bruteforce_paths(url.as_str(), words, accepted, threads, progress)
        .await;
    hits.sort();

    println!();
    for (hit_url, status) in &hits {
        println!("  {} {}", status_colored(*status), hit_url);
    }
    println!(
        "\n{} {} paths found\n",
        "✓".green().bold(),
        hits.len().to_string().cyan()
    );
}
