// 8.0: engine. one session runner per market, each on its own task, no shared
// mutable state between them. the orchestrator joins them and surfaces the
// first failure.

mod config;
mod core;
mod results;
mod runner;

pub use config::EngineConfig;
pub use core::PaperEngine;
pub use results::{EngineError, SessionSummary};
pub use runner::{RunnerState, SessionRunner};
