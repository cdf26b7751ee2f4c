//! Retrying stage runner.
//!
//! Every attempt leases a new key from the coordinator, so a bad key gets one
//! try and the retry moves on to the next key in the rotation. Attempts are
//! separated by a fixed delay; attempt counts are small so there is no
//! exponential back-off.

use std::sync::Arc;
use std::time::Duration;

use scribeflow_common::{Error, Result};
use scribeflow_keys::LeaseCoordinator;

use crate::stage::RemoteStage;

/// Default number of remote calls per unit of work.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Bounded retry with a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of remote calls; values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Runs one [`RemoteStage`] call to completion under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct StageRunner {
    coordinator: Arc<LeaseCoordinator>,
    policy: RetryPolicy,
}

impl StageRunner {
    /// Create a runner that leases keys from `coordinator`.
    pub fn new(coordinator: Arc<LeaseCoordinator>, policy: RetryPolicy) -> Self {
        Self {
            coordinator,
            policy,
        }
    }

    /// The policy in effect.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run `stage` on `input` until it succeeds or the attempts run out.
    ///
    /// `label` identifies the unit of work in logs and lease records.
    ///
    /// # Errors
    ///
    /// - [`Error::NoCredentialsAvailable`] straight away if the pool is empty.
    /// - [`Error::MaxAttemptsExceeded`] carrying the last attempt's error once
    ///   every attempt has failed.
    pub async fn run<I, S>(&self, label: &str, stage: Arc<S>, input: I) -> Result<String>
    where
        I: Send + Sync + 'static,
        S: RemoteStage<I> + ?Sized + 'static,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let input = Arc::new(input);
        let stage_name = stage.name().to_string();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let lease = self.coordinator.acquire(label)?;
            tracing::info!(
                "[{label}] {stage_name}: attempt {attempt}/{max_attempts} with key {}",
                lease.credential
            );

            let call_stage = Arc::clone(&stage);
            let call_input = Arc::clone(&input);
            let credential = lease.credential;
            let outcome = tokio::task::spawn_blocking(move || {
                call_stage.call(&credential, &call_input)
            })
            .await
            .unwrap_or_else(|e| Err(Error::Internal(format!("spawn_blocking join error: {e}"))));

            let err = match outcome {
                Ok(output) => {
                    tracing::info!("[{label}] {stage_name}: succeeded on attempt {attempt}");
                    return Ok(output);
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                tracing::error!("[{label}] {stage_name}: {err}");
                return Err(err);
            }

            if attempt >= max_attempts {
                tracing::error!(
                    "[{label}] {stage_name}: giving up after {attempt} attempts: {err}"
                );
                return Err(Error::max_attempts(stage_name, attempt, err));
            }

            tracing::warn!(
                "[{label}] {stage_name}: attempt {attempt} failed: {err}; retrying in {:?} with the next key",
                self.policy.delay
            );
            tokio::time::sleep(self.policy.delay).await;
        }
    }
}
