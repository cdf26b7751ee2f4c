//! Pipeline controller: fan-out, combine, then a sequential chain.
//!
//! ```text
//! Pending -> FanOut -> Combine -> Chain{1} -> ... -> Chain{n} -> Completed
//!                 \         \          \                  \
//!                  +---------+----------+------------------+--> Aborted
//! ```
//!
//! The fan-out collects every item's result before moving on. The combine
//! step joins the successful outputs in work-item order. Each chain stage
//! takes the previous stage's output as its only input, and the first chain
//! failure skips everything after it.

use std::fmt;
use std::sync::Arc;

use scribeflow_common::{Error, WorkItem};
use scribeflow_keys::LeaseCoordinator;

use crate::executor::run_all;
use crate::retry::{RetryPolicy, StageRunner};
use crate::stage::RemoteStage;

/// Default fan-out concurrency ceiling.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Where a pipeline run is, or where it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started.
    Pending,
    /// Running the fan-out stage.
    FanOut,
    /// Joining fan-out outputs.
    Combine,
    /// Running chain stage `stage` (1-based).
    Chain { stage: usize },
    /// Every stage produced output.
    Completed,
    /// Stopped at `stage` because of `reason`.
    Aborted { stage: String, reason: String },
}

impl PipelineState {
    /// Whether the run has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Aborted { .. })
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Pending => f.write_str("pending"),
            PipelineState::FanOut => f.write_str("fan-out"),
            PipelineState::Combine => f.write_str("combine"),
            PipelineState::Chain { stage } => write!(f, "chain stage {stage}"),
            PipelineState::Completed => f.write_str("completed"),
            PipelineState::Aborted { stage, reason } => {
                write!(f, "aborted at {stage}: {reason}")
            }
        }
    }
}

/// Settings for one controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Maximum fan-out items in flight.
    pub concurrency: usize,
    /// Retry policy for every stage call.
    pub retry: RetryPolicy,
    /// Inserted between fan-out outputs when combining.
    pub separator: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            separator: String::new(),
        }
    }
}

/// Result of one fan-out item.
#[derive(Debug)]
pub struct ItemOutcome {
    pub item: WorkItem,
    pub result: Result<String, Error>,
}

/// Result of one chain stage that was started.
#[derive(Debug)]
pub struct StageOutcome {
    pub name: String,
    pub result: Result<String, Error>,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct PipelineReport {
    /// Terminal state.
    pub state: PipelineState,
    /// Fan-out results, sorted by work item.
    pub fan_out: Vec<ItemOutcome>,
    /// Combined fan-out output, if at least one item succeeded.
    pub combined: Option<String>,
    /// Chain stages that were started, in order. Skipped stages are absent.
    pub chain: Vec<StageOutcome>,
}

impl PipelineReport {
    /// Whether every stage produced output.
    pub fn is_completed(&self) -> bool {
        self.state == PipelineState::Completed
    }

    /// Output of the last chain stage, or the combined output when the chain
    /// is empty. `None` unless the run completed.
    pub fn final_output(&self) -> Option<&str> {
        if !self.is_completed() {
            return None;
        }
        match self.chain.last() {
            Some(stage) => stage.result.as_ref().ok().map(String::as_str),
            None => self.combined.as_deref(),
        }
    }

    /// Number of fan-out items that succeeded.
    pub fn succeeded_items(&self) -> usize {
        self.fan_out.iter().filter(|o| o.result.is_ok()).count()
    }
}

/// Runs one pipeline: fan-out over work items, combine, sequential chain.
///
/// The controller owns the shared [`LeaseCoordinator`] handle and passes it
/// to every stage run.
pub struct PipelineController {
    coordinator: Arc<LeaseCoordinator>,
    config: ControllerConfig,
    state: PipelineState,
}

impl PipelineController {
    /// Create a controller.
    pub fn new(coordinator: Arc<LeaseCoordinator>, config: ControllerConfig) -> Self {
        Self {
            coordinator,
            config,
            state: PipelineState::Pending,
        }
    }

    /// Current state.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// The coordinator shared with every stage.
    pub fn coordinator(&self) -> &Arc<LeaseCoordinator> {
        &self.coordinator
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::info!("Pipeline: {} -> {}", self.state, next);
        self.state = next;
    }

    fn abort(&mut self, stage: impl Into<String>, reason: impl Into<String>) {
        let stage = stage.into();
        let reason = reason.into();
        tracing::error!("Pipeline aborted at {stage}: {reason}");
        self.transition(PipelineState::Aborted { stage, reason });
    }

    /// Run the pipeline to a terminal state.
    ///
    /// Never returns an error: every failure ends up in the report.
    pub async fn run(
        &mut self,
        fan_out: Arc<dyn RemoteStage<WorkItem>>,
        chain: &[Arc<dyn RemoteStage<String>>],
        mut items: Vec<WorkItem>,
    ) -> PipelineReport {
        let runner = StageRunner::new(Arc::clone(&self.coordinator), self.config.retry);

        // -- Fan-out ----------------------------------------------------------
        self.transition(PipelineState::FanOut);
        items.sort();
        let fan_out_name = fan_out.name().to_string();

        let results = {
            let runner = runner.clone();
            let stage = Arc::clone(&fan_out);
            run_all(items.clone(), self.config.concurrency, move |item: WorkItem| {
                let runner = runner.clone();
                let stage = Arc::clone(&stage);
                async move {
                    let label = item.id();
                    runner.run(&label, stage, item).await
                }
            })
            .await
        };

        let fan_out_report: Vec<ItemOutcome> = items
            .into_iter()
            .zip(results)
            .map(|(item, result)| ItemOutcome { item, result })
            .collect();

        for outcome in &fan_out_report {
            if let Err(e) = &outcome.result {
                tracing::warn!("{fan_out_name} failed for {}: {e}", outcome.item);
            }
        }

        // An empty pool fails every item the same way; report that cause.
        let no_credentials = !fan_out_report.is_empty()
            && fan_out_report
                .iter()
                .all(|o| matches!(o.result, Err(Error::NoCredentialsAvailable)));
        if no_credentials {
            self.abort("fan-out", Error::NoCredentialsAvailable.to_string());
            return PipelineReport {
                state: self.state.clone(),
                fan_out: fan_out_report,
                combined: None,
                chain: Vec::new(),
            };
        }

        // -- Combine ----------------------------------------------------------
        self.transition(PipelineState::Combine);
        let successes: Vec<&str> = fan_out_report
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(String::as_str))
            .collect();

        tracing::info!(
            "{fan_out_name}: {}/{} item(s) succeeded",
            successes.len(),
            fan_out_report.len()
        );

        if successes.is_empty() {
            self.abort(
                "combine",
                format!("no {fan_out_name} output succeeded"),
            );
            return PipelineReport {
                state: self.state.clone(),
                fan_out: fan_out_report,
                combined: None,
                chain: Vec::new(),
            };
        }

        let combined = successes.join(&self.config.separator);

        // -- Sequential chain -------------------------------------------------
        let mut chain_report = Vec::with_capacity(chain.len());
        let mut current = combined.clone();

        for (i, stage) in chain.iter().enumerate() {
            self.transition(PipelineState::Chain { stage: i + 1 });
            let name = stage.name().to_string();

            match runner.run(&name, Arc::clone(stage), current.clone()).await {
                Ok(output) => {
                    current = output.clone();
                    chain_report.push(StageOutcome {
                        name,
                        result: Ok(output),
                    });
                }
                Err(e) => {
                    let reason = e.to_string();
                    chain_report.push(StageOutcome {
                        name: name.clone(),
                        result: Err(e),
                    });
                    self.abort(name, reason);
                    return PipelineReport {
                        state: self.state.clone(),
                        fan_out: fan_out_report,
                        combined: Some(combined),
                        chain: chain_report,
                    };
                }
            }
        }

        self.transition(PipelineState::Completed);
        PipelineReport {
            state: self.state.clone(),
            fan_out: fan_out_report,
            combined: Some(combined),
            chain: chain_report,
        }
    }
}
