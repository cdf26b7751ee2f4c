//! # scribeflow-pipeline
//!
//! Resilient execution of remote inference work on top of a shared
//! [`LeaseCoordinator`](scribeflow_keys::LeaseCoordinator).
//!
//! This crate provides:
//!
//! - **[`RemoteStage`]** trait -- one blocking remote call that takes a leased
//!   key and an input and returns text.
//! - **[`run_all`]** -- runs independent items with a fixed concurrency
//!   ceiling and returns their results in input order.
//! - **[`StageRunner`]** -- retries a stage with a fresh key on every attempt
//!   and a fixed delay between attempts.
//! - **[`PipelineController`]** -- a fan-out stage, a combine step, and a
//!   chain of strictly sequential stages that aborts on the first failure.

pub mod controller;
pub mod executor;
pub mod retry;
pub mod stage;

// Re-export key types at the crate root.
pub use controller::{
    ControllerConfig, ItemOutcome, PipelineController, PipelineReport, PipelineState,
    StageOutcome,
};
pub use executor::run_all;
pub use retry::{RetryPolicy, StageRunner};
pub use stage::RemoteStage;
