//! The transformer pipeline: an ordered list of stages, each consuming and
//! returning the enrichment graph.
//!
//! The orchestrator itself is headless. Whether a non-essential stage runs
//! is decided by an injected [`ConfirmFn`]; the interactive console
//! implementation lives in the CLI binary.

use crate::config::RunConfig;
use crate::graph::EnrichmentGraph;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Static stage metadata, consumed uniformly by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct StageDescriptor {
    /// Always runs, no operator gate.
    pub essential: bool,
    /// Default answer when the operator is prompted.
    pub recommended: bool,
    /// Read-only OSINT lookups, as opposed to direct probing of the target.
    pub passive: bool,
}

/// Terminal and intermediate states of one stage.
/// `Pending -> {Skipped | Confirming -> Running -> {Done | Failed}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Confirming,
    Running,
    Skipped,
    Done,
    Failed,
}

/// Decides whether a non-essential stage runs, given its name and
/// descriptor.
pub type ConfirmFn = Arc<dyn Fn(&str, StageDescriptor) -> bool + Send + Sync>;

/// Answers every confirmation with the stage's recommended default.
/// Used for headless runs and tests.
pub fn assume_recommended() -> ConfirmFn {
    Arc::new(|_, descriptor| descriptor.recommended)
}

#[async_trait]
pub trait Stage: Send {
    fn name(&self) -> &'static str;

    fn descriptor(&self) -> StageDescriptor;

    /// Collects stage parameters (wordlists, resolver lists) before any
    /// network activity. A failure here halts the stage, and the whole run
    /// only if the stage is essential.
    fn setup(&mut self, _config: &RunConfig) -> Result<()> {
        Ok(())
    }

    /// Mutates the graph in place. Later stages observe the fully-merged
    /// output of every earlier stage that ran, and must tolerate enrichment
    /// that a skipped stage never produced.
    async fn run(&self, graph: &mut EnrichmentGraph) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub name: &'static str,
    pub state: StageState,
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    confirm: ConfirmFn,
}

impl Pipeline {
    pub fn new(confirm: ConfirmFn) -> Self {
        Self {
            stages: Vec::new(),
            confirm,
        }
    }

    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Runs every stage in declared order against the graph. Per-stage
    /// failures degrade to warnings unless the stage is essential; the
    /// pipeline always emits whatever was gathered.
    pub async fn run(
        mut self,
        graph: &mut EnrichmentGraph,
        config: &RunConfig,
    ) -> Result<Vec<StageReport>> {
        let mut reports = Vec::with_capacity(self.stages.len());

        for stage in self.stages.iter_mut() {
            let name = stage.name();
            let descriptor = stage.descriptor();

            if !descriptor.essential && !(self.confirm)(name, descriptor) {
                info!("stage {} skipped by operator", name);
                reports.push(StageReport {
                    name,
                    state: StageState::Skipped,
                });
                continue;
            }

            if let Err(e) = stage.setup(config) {
                if descriptor.essential {
                    return Err(e).with_context(|| format!("setup failed for stage {}", name));
                }
                warn!("setup failed for stage {}: {:#}", name, e);
                reports.push(StageReport {
                    name,
                    state: StageState::Failed,
                });
                continue;
            }

            info!("running stage {}", name);
            match stage.run(graph).await {
                Ok(()) => reports.push(StageReport {
                    name,
                    state: StageState::Done,
                }),
                Err(e) => {
                    if descriptor.essential {
                        return Err(e).with_context(|| format!("stage {} failed", name));
                    }
                    warn!("stage {} failed: {:#}", name, e);
                    reports.push(StageReport {
                        name,
                        state: StageState::Failed,
                    });
                }
            }
        }

        Ok(reports)
    }
}
