pub mod config;
pub mod discovery;
pub mod export;
pub mod geoip;
pub mod graph;
pub mod pipeline;
pub mod stages;
pub mod wordlist;

pub use config::RunConfig;
pub use graph::EnrichmentGraph;
pub use pipeline::{
    assume_recommended, ConfirmFn, Pipeline, Stage, StageDescriptor, StageReport, StageState,
};
