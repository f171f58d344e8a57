//! Ordered hook registry with forward start and reverse stop semantics.
//!
//! The registry is the only piece of lifecycle state: an append-only hook
//! sequence plus a count of how many hooks have started successfully. Start
//! walks forward and fails fast; stop walks the started prefix backward and
//! collects failures instead of aborting, so cleanup of earlier-started
//! hooks always runs.

use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::types::{Hook, HookAction, HookContext};
use crate::errors::{PhaseError, StopFailure};

struct RegisteredHook {
    on_start: Option<HookAction>,
    on_stop: Option<HookAction>,
    origin: String,
}

#[derive(Default)]
struct Inner {
    hooks: Vec<RegisteredHook>,
    started: usize,
}

/// Coordinates component start/stop hooks for one application.
///
/// Cloning yields another handle to the same registry, so it can be handed
/// to components during construction while the orchestrator keeps its own
/// handle. Hooks run forward in append order on start and in reverse order
/// on stop, limited to the prefix whose start actions succeeded.
#[derive(Clone, Default)]
pub struct Lifecycle {
    inner: Arc<Mutex<Inner>>,
}

impl Lifecycle {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to the end of the sequence. Never fails.
    ///
    /// The hook's origin label defaults to this call site.
    #[track_caller]
    pub fn append(&self, hook: Hook) {
        let origin = hook
            .origin
            .unwrap_or_else(|| Location::caller().to_string());
        self.lock().hooks.push(RegisteredHook {
            on_start: hook.on_start,
            on_stop: hook.on_stop,
            origin,
        });
    }

    /// Number of appended hooks.
    pub fn len(&self) -> usize {
        self.lock().hooks.len()
    }

    /// Whether no hooks have been appended.
    pub fn is_empty(&self) -> bool {
        self.lock().hooks.is_empty()
    }

    /// Number of hooks, counted from the front, whose start action has
    /// succeeded and whose stop action has not yet run.
    pub fn started_count(&self) -> usize {
        self.lock().started
    }

    /// Run start actions front-to-back, failing fast.
    ///
    /// On failure the started count equals exactly the number of hooks, from
    /// the front, whose start action succeeded; the failing hook is not
    /// counted and no later hook is attempted.
    pub(crate) async fn start(&self, ctx: HookContext) -> Result<(), PhaseError> {
        loop {
            let next = {
                let inner = self.lock();
                if inner.started >= inner.hooks.len() {
                    break;
                }
                let hook = &inner.hooks[inner.started];
                (hook.on_start.clone(), hook.origin.clone())
            };
            let (action, origin) = next;
            if let Some(action) = action {
                debug!(origin = %origin, "running start hook");
                if let Err(source) = action(ctx).await {
                    return Err(PhaseError::StartHook { origin, source });
                }
            }
            self.lock().started += 1;
        }
        Ok(())
    }

    /// Run stop actions for the started prefix, in reverse, best-effort.
    ///
    /// Every hook in the prefix is processed even when earlier (later-
    /// registered) stop actions fail; failures accumulate into a single
    /// [`PhaseError::StopHooks`]. A call with nothing started is a no-op.
    pub(crate) async fn stop(&self, ctx: HookContext) -> Result<(), PhaseError> {
        let mut failures = Vec::new();
        loop {
            let next = {
                let mut inner = self.lock();
                if inner.started == 0 {
                    break;
                }
                inner.started -= 1;
                let hook = &inner.hooks[inner.started];
                (hook.on_stop.clone(), hook.origin.clone())
            };
            let (action, origin) = next;
            if let Some(action) = action {
                debug!(origin = %origin, "running stop hook");
                if let Err(error) = action(ctx).await {
                    failures.push(StopFailure { origin, error });
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PhaseError::StopHooks { failures })
        }
    }

    // The lock is held only for registry bookkeeping, never across an await
    // or a user callback, so poisoning cannot leave partial state behind.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Lifecycle")
            .field("hooks", &inner.hooks.len())
            .field("started", &inner.started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Phase;
    use anyhow::anyhow;
    use std::sync::Mutex as StdMutex;

    type Log = Arc<StdMutex<Vec<&'static str>>>;

    fn tracked_hook(log: &Log, start: &'static str, stop: &'static str) -> Hook {
        let start_log = log.clone();
        let stop_log = log.clone();
        Hook::new()
            .on_start(move |_ctx| {
                let log = start_log.clone();
                async move {
                    log.lock().unwrap().push(start);
                    Ok(())
                }
            })
            .on_stop(move |_ctx| {
                let log = stop_log.clone();
                async move {
                    log.lock().unwrap().push(stop);
                    Ok(())
                }
            })
    }

    fn failing_start_hook(origin: &'static str) -> Hook {
        Hook::new()
            .on_start(|_ctx| async { Err(anyhow!("start refused")) })
            .origin(origin)
    }

    #[tokio::test]
    async fn start_runs_hooks_in_append_order() {
        let log: Log = Arc::default();
        let lifecycle = Lifecycle::new();
        lifecycle.append(tracked_hook(&log, "a:start", "a:stop"));
        lifecycle.append(tracked_hook(&log, "b:start", "b:stop"));
        lifecycle.append(tracked_hook(&log, "c:start", "c:stop"));

        lifecycle
            .start(HookContext::unbounded(Phase::Start))
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a:start", "b:start", "c:start"]);
        assert_eq!(lifecycle.started_count(), 3);
    }

    #[tokio::test]
    async fn stop_runs_in_reverse_registration_order() {
        let log: Log = Arc::default();
        let lifecycle = Lifecycle::new();
        lifecycle.append(tracked_hook(&log, "a:start", "a:stop"));
        lifecycle.append(tracked_hook(&log, "b:start", "b:stop"));
        lifecycle.append(tracked_hook(&log, "c:start", "c:stop"));

        lifecycle
            .start(HookContext::unbounded(Phase::Start))
            .await
            .unwrap();
        log.lock().unwrap().clear();

        lifecycle
            .stop(HookContext::unbounded(Phase::Stop))
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["c:stop", "b:stop", "a:stop"]);
        assert_eq!(lifecycle.started_count(), 0);
    }

    #[tokio::test]
    async fn start_failure_skips_later_hooks() {
        let log: Log = Arc::default();
        let lifecycle = Lifecycle::new();
        lifecycle.append(tracked_hook(&log, "a:start", "a:stop"));
        lifecycle.append(failing_start_hook("b"));
        lifecycle.append(tracked_hook(&log, "c:start", "c:stop"));

        let err = lifecycle
            .start(HookContext::unbounded(Phase::Start))
            .await
            .unwrap_err();

        match &err {
            PhaseError::StartHook { origin, .. } => assert_eq!(origin, "b"),
            other => panic!("expected StartHook, got {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["a:start"]);
        assert_eq!(lifecycle.started_count(), 1);
    }

    #[tokio::test]
    async fn stop_covers_only_the_started_prefix() {
        let log: Log = Arc::default();
        let lifecycle = Lifecycle::new();
        lifecycle.append(tracked_hook(&log, "a:start", "a:stop"));
        lifecycle.append(failing_start_hook("b"));

        lifecycle
            .start(HookContext::unbounded(Phase::Start))
            .await
            .unwrap_err();
        lifecycle
            .stop(HookContext::unbounded(Phase::Stop))
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a:start", "a:stop"]);
    }

    #[tokio::test]
    async fn stop_continues_past_failures_and_collects_them() {
        let log: Log = Arc::default();
        let lifecycle = Lifecycle::new();
        lifecycle.append(tracked_hook(&log, "a:start", "a:stop"));
        lifecycle.append(
            Hook::new()
                .on_start(|_ctx| async { Ok(()) })
                .on_stop(|_ctx| async { Err(anyhow!("drain failed")) })
                .origin("b"),
        );
        lifecycle.append(tracked_hook(&log, "c:start", "c:stop"));

        lifecycle
            .start(HookContext::unbounded(Phase::Start))
            .await
            .unwrap();
        log.lock().unwrap().clear();

        let err = lifecycle
            .stop(HookContext::unbounded(Phase::Stop))
            .await
            .unwrap_err();

        match &err {
            PhaseError::StopHooks { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].origin, "b");
            }
            other => panic!("expected StopHooks, got {other:?}"),
        }
        // a's stop still ran after b's failed.
        assert_eq!(*log.lock().unwrap(), vec!["c:stop", "a:stop"]);
        assert_eq!(lifecycle.started_count(), 0);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let log: Log = Arc::default();
        let lifecycle = Lifecycle::new();
        lifecycle.append(tracked_hook(&log, "a:start", "a:stop"));

        lifecycle
            .start(HookContext::unbounded(Phase::Start))
            .await
            .unwrap();
        lifecycle
            .stop(HookContext::unbounded(Phase::Stop))
            .await
            .unwrap();
        log.lock().unwrap().clear();

        lifecycle
            .stop(HookContext::unbounded(Phase::Stop))
            .await
            .unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hook_without_start_action_counts_as_started() {
        let log: Log = Arc::default();
        let stop_log = log.clone();
        let lifecycle = Lifecycle::new();
        lifecycle.append(
            Hook::new()
                .on_stop(move |_ctx| {
                    let log = stop_log.clone();
                    async move {
                        log.lock().unwrap().push("stop-only");
                        Ok(())
                    }
                })
                .origin("stop-only"),
        );

        lifecycle
            .start(HookContext::unbounded(Phase::Start))
            .await
            .unwrap();
        assert_eq!(lifecycle.started_count(), 1);

        lifecycle
            .stop(HookContext::unbounded(Phase::Stop))
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["stop-only"]);
    }

    #[tokio::test]
    async fn append_records_the_call_site_when_no_origin_is_given() {
        let lifecycle = Lifecycle::new();
        lifecycle.append(Hook::new().on_start(|_ctx| async { Err(anyhow!("boom")) }));

        let err = lifecycle
            .start(HookContext::unbounded(Phase::Start))
            .await
            .unwrap_err();
        match &err {
            PhaseError::StartHook { origin, .. } => {
                assert!(origin.contains("registry.rs"), "origin was {origin}");
            }
            other => panic!("expected StartHook, got {other:?}"),
        }
    }
}
