//! Wires the scheduler (C10), the read-only query service (C11), and the
//! per-tick pipeline together behind a typed `Config`. The HTTP shell
//! (`bin/onchain-serve.rs`) is the only consumer of this crate's public
//! surface outside of its own tests.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod quality;
pub mod query;
pub mod scheduler;

pub use config::Config;
pub use error::Error;
pub use pipeline::{run_tick, PipelineContext};
pub use query::QueryService;
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState, TickStatus};
