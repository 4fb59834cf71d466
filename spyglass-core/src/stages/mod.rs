//! The pipeline stages, in the order a full run executes them.

mod domain;
mod http;
mod ip;
mod path;
mod port;

pub use domain::{SubdomainBruteforceStage, SubdomainDiscoveryStage};
pub use http::HttpProbeStage;
pub use ip::{GeoIpStage, IpResolutionStage};
pub use path::SensitivePathStage;
pub use port::PortScanStage;

use crate::pipeline::Stage;
use spyglass_engine::ProgressFn;

/// Invoked at the start of each phase with a label and the number of work
/// items, returning the per-item progress callback for that phase. The
/// indicatif-backed implementation lives in the CLI.
pub type ProgressFactory =
    std::sync::Arc<dyn Fn(&str, usize) -> Option<ProgressFn> + Send + Sync>;

pub fn no_progress() -> ProgressFactory {
    std::sync::Arc::new(|_, _| None)
}

/// Every stage of a full run, in execution order.
pub fn full_run(progress: ProgressFactory, virustotal_key: Option<String>) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(SubdomainDiscoveryStage::new(
            progress.clone(),
            virustotal_key,
        )),
        Box::new(SubdomainBruteforceStage::new(progress.clone())),
        Box::new(IpResolutionStage::new(progress.clone())),
        Box::new(GeoIpStage::new()),
        Box::new(HttpProbeStage::new(progress.clone())),
        Box::new(PortScanStage::new(progress.clone())),
        Box::new(SensitivePathStage::new(progress)),
    ]
}
