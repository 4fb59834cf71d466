use anyhow::{bail, Result};
use async_trait::async_trait;
use spyglass_core::pipeline::{
    assume_recommended, ConfirmFn, Pipeline, Stage, StageDescriptor, StageState,
};
use spyglass_core::{EnrichmentGraph, RunConfig};
use std::sync::{Arc, Mutex};

/// Records its execution into a shared log instead of touching the network.
struct RecordingStage {
    name: &'static str,
    descriptor: StageDescriptor,
    fail: bool,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingStage {
    fn ok(
        name: &'static str,
        descriptor: StageDescriptor,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Box<Self> {
        Box::new(Self {
            name,
            descriptor,
            fail: false,
            log: log.clone(),
        })
    }

    fn failing(
        name: &'static str,
        descriptor: StageDescriptor,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Box<Self> {
        Box::new(Self {
            name,
            descriptor,
            fail: true,
            log: log.clone(),
        })
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn descriptor(&self) -> StageDescriptor {
        self.descriptor
    }

    async fn run(&self, _graph: &mut EnrichmentGraph) -> Result<()> {
        self.log.lock().unwrap().push(self.name);
        if self.fail {
            bail!("{} blew up", self.name);
        }
        Ok(())
    }
}

const ESSENTIAL: StageDescriptor = StageDescriptor {
    essential: true,
    recommended: true,
    passive: true,
};
const OPTIONAL: StageDescriptor = StageDescriptor {
    essential: false,
    recommended: true,
    passive: false,
};
const OFF_BY_DEFAULT: StageDescriptor = StageDescriptor {
    essential: false,
    recommended: false,
    passive: false,
};

fn refuse_everything() -> ConfirmFn {
    Arc::new(|_, _| false)
}

#[tokio::test]
async fn stages_run_in_declared_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(assume_recommended())
        .with_stage(RecordingStage::ok("first", ESSENTIAL, &log))
        .with_stage(RecordingStage::ok("second", OPTIONAL, &log))
        .with_stage(RecordingStage::ok("third", OPTIONAL, &log));

    let mut graph = EnrichmentGraph::new(["example.com"]);
    let reports = pipeline.run(&mut graph, &RunConfig::default()).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    assert!(reports.iter().all(|r| r.state == StageState::Done));
}

#[tokio::test]
async fn essential_stages_ignore_the_confirmer() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(refuse_everything())
        .with_stage(RecordingStage::ok("essential", ESSENTIAL, &log))
        .with_stage(RecordingStage::ok("optional", OPTIONAL, &log));

    let mut graph = EnrichmentGraph::new(["example.com"]);
    let reports = pipeline.run(&mut graph, &RunConfig::default()).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["essential"]);
    assert_eq!(reports[0].state, StageState::Done);
    assert_eq!(reports[1].state, StageState::Skipped);
}

#[tokio::test]
async fn recommended_defaults_drive_headless_runs() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(assume_recommended())
        .with_stage(RecordingStage::ok("recommended", OPTIONAL, &log))
        .with_stage(RecordingStage::ok("noisy", OFF_BY_DEFAULT, &log));

    let mut graph = EnrichmentGraph::new(["example.com"]);
    let reports = pipeline.run(&mut graph, &RunConfig::default()).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["recommended"]);
    assert_eq!(reports[1].state, StageState::Skipped);
}

#[tokio::test]
async fn a_failing_optional_stage_does_not_stop_the_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(assume_recommended())
        .with_stage(RecordingStage::failing("broken", OPTIONAL, &log))
        .with_stage(RecordingStage::ok("after", OPTIONAL, &log));

    let mut graph = EnrichmentGraph::new(["example.com"]);
    let reports = pipeline.run(&mut graph, &RunConfig::default()).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["broken", "after"]);
    assert_eq!(reports[0].state, StageState::Failed);
    assert_eq!(reports[1].state, StageState::Done);
}

#[tokio::test]
async fn a_failing_essential_stage_aborts_the_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(assume_recommended())
        .with_stage(RecordingStage::failing("critical", ESSENTIAL, &log))
        .with_stage(RecordingStage::ok("never", OPTIONAL, &log));

    let mut graph = EnrichmentGraph::new(["example.com"]);
    let result = pipeline.run(&mut graph, &RunConfig::default()).await;

    assert!(result.is_err());
    assert_eq!(*log.lock().unwrap(), vec!["critical"]);
}

/// A skipped upstream stage leaves the graph unenriched; downstream stages
/// see the empty graph and complete without producing anything.
#[tokio::test]
async fn downstream_stages_tolerate_skipped_enrichment() {
    struct CountingStage {
        seen_hostnames: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl Stage for CountingStage {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn descriptor(&self) -> StageDescriptor {
            OPTIONAL
        }

        async fn run(&self, graph: &mut EnrichmentGraph) -> Result<()> {
            *self.seen_hostnames.lock().unwrap() = graph.hostnames().len();
            Ok(())
        }
    }

    let seen = Arc::new(Mutex::new(0));
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline =
        Pipeline::new(Arc::new(|name: &str, _: StageDescriptor| name != "discovery-like"))
        .with_stage(RecordingStage::ok("discovery-like", OPTIONAL, &log))
        .with_stage(Box::new(CountingStage {
            seen_hostnames: seen.clone(),
        }));

    let mut graph = EnrichmentGraph::new(["example.com"]);
    let reports = pipeline.run(&mut graph, &RunConfig::default()).await.unwrap();

    assert_eq!(reports[0].state, StageState::Skipped);
    assert_eq!(reports[1].state, StageState::Done);
    // Only the seed itself; no subdomains were ever discovered.
    assert_eq!(*seen.lock().unwrap(), 1);
}
