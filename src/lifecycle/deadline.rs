//! Deadline-bounded phase execution.
//!
//! A phase body runs as its own task while the caller races completion
//! against the configured timeout. When the deadline wins the task is
//! abandoned: it keeps running in the background and the caller gets a
//! timeout failure immediately. Well-behaved hook actions observe
//! [`HookContext::expired`] and return promptly once the deadline passes.

use std::future::Future;
use std::time::Duration;

use tokio::time;
use tracing::warn;

use super::types::{HookContext, Phase};
use crate::errors::PhaseError;

/// Run `body` against a context bounded by `timeout`, returning whichever
/// settles first: the phase result or a deadline failure.
pub(crate) async fn run_phase<F, Fut>(
    phase: Phase,
    timeout: Duration,
    body: F,
) -> Result<(), PhaseError>
where
    F: FnOnce(HookContext) -> Fut,
    Fut: Future<Output = Result<(), PhaseError>> + Send + 'static,
{
    let ctx = HookContext::bounded(phase, timeout);
    let task = tokio::spawn(body(ctx));
    match time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            warn!(%phase, %join_error, "phase task panicked");
            Err(PhaseError::Panicked { phase })
        }
        Err(_) => {
            warn!(%phase, ?timeout, "phase deadline exceeded, abandoning phase task");
            Err(PhaseError::DeadlineExceeded { phase, timeout })
        }
    }
}
