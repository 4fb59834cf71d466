//! Line-oriented input file loading.
//!
//! Wordlists come from all over; some ship with latin-1 bytes that are not
//! valid UTF-8, so loading goes byte-by-byte instead of through
//! `read_to_string` and never fails on encoding.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Loads a plain list: one entry per line, blanks and `#` comments skipped.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read wordlist {}", path.display()))?;

    // Latin-1: every byte maps to exactly one char.
    let text: String = bytes.iter().map(|&b| b as char).collect();

    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();

    if lines.is_empty() {
        bail!(
            "wordlist {} is empty or contains only comments",
            path.display()
        );
    }

    Ok(lines)
}

/// Loads a tab-separated `entry<TAB>description` list. A missing description
/// is tolerated and comes back empty.
pub fn load_indexed(path: &Path) -> Result<Vec<(String, String)>> {
    let lines = load_lines(path)?;
    Ok(lines
        .into_iter()
        .map(|line| match line.split_once('\t') {
            Some((entry, description)) => {
                (entry.trim().to_string(), description.trim().to_string())
            }
            None => (line, String::new()),
        })
        .collect())
}

/// Parses a port index into numeric ports with descriptions, skipping
/// entries outside 1-65535.
pub fn load_ports(path: &Path) -> Result<Vec<(u16, String)>> {
    let entries = load_indexed(path)?;
    let mut ports = Vec::with_capacity(entries.len());
    for (entry, description) in entries {
        match entry.parse::<u16>() {
            Ok(port) if port > 0 => ports.push((port, description)),
            _ => tracing::warn!("skipping invalid port entry '{}'", entry),
        }
    }
    if ports.is_empty() {
        bail!("port list {} contains no valid ports", path.display());
    }
    Ok(ports)
}
