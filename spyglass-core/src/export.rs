//! Snapshot export.
//!
//! The graph serializes to one JSON document. Keys are ordered maps all the
//! way down, so two runs over the same data produce byte-identical output.

use crate::graph::EnrichmentGraph;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn to_json(graph: &EnrichmentGraph) -> Result<String> {
    serde_json::to_string_pretty(graph).context("failed to serialize graph")
}

/// Writes the snapshot to `output`, or to stdout when no path was given.
pub fn export_snapshot(graph: &EnrichmentGraph, output: Option<&Path>) -> Result<()> {
    let json = to_json(graph)?;
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
