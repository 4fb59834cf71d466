pub mod defaults;
pub mod dns;
pub mod engine;
pub mod error;
pub mod http;
pub mod tcp;

pub use engine::{run_all, Limiter, ProgressFn, ResultSink};
pub use error::{EngineError, Result};
