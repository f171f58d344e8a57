//! The application orchestrator: start, wait for shutdown, stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::errors::{AppError, ConstructionError};
use crate::lifecycle::{Lifecycle, Phase, run_phase};
use crate::shutdown::{Broadcaster, ShutdownListener, Shutdowner, spawn_relay};

pub(crate) type ErrorObserver = Box<dyn Fn(&AppError) + Send + Sync>;

/// A long-running application composed from lifecycle hooks.
///
/// Built by [`AppBuilder`](crate::app::AppBuilder). Most callers use the
/// all-in-one [`App::run`]; `start`, `done` and `stop` are exposed for
/// drivers with more specialized needs. `start` and `stop` must be
/// serialized by the caller: no two phases may run concurrently against
/// the same application.
pub struct App {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) hub: Arc<Broadcaster>,
    pub(crate) start_timeout: Duration,
    pub(crate) stop_timeout: Duration,
    pub(crate) error: Option<Arc<ConstructionError>>,
    pub(crate) observers: Vec<ErrorObserver>,
    pub(crate) relay_started: AtomicBool,
}

impl App {
    /// The hook registry. Useful for appending hooks outside of
    /// construction-time wiring, e.g. in tests.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// A handle for requesting shutdown, identical to the one injected into
    /// components during construction.
    pub fn shutdowner(&self) -> Shutdowner {
        Shutdowner::new(Arc::clone(&self.hub))
    }

    /// The sticky construction error, if construction failed.
    ///
    /// `start` and `stop` short-circuit on this same error, so checking it
    /// up front is optional.
    pub fn construction_error(&self) -> Option<&ConstructionError> {
        self.error.as_deref()
    }

    /// The configured start-phase deadline.
    pub fn start_timeout(&self) -> Duration {
        self.start_timeout
    }

    /// The configured stop-phase deadline.
    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Register a shutdown listener.
    ///
    /// The first call also begins listening for OS termination signals
    /// (SIGINT/SIGTERM), which are broadcast to every listener exactly like
    /// an explicit [`Shutdowner::shutdown`]. Must be called from within a
    /// tokio runtime.
    pub fn done(&self) -> ShutdownListener {
        if !self.relay_started.swap(true, Ordering::SeqCst) {
            spawn_relay(Arc::clone(&self.hub));
        }
        self.hub.listen()
    }

    /// Run all start hooks in registration order, bounded by the start
    /// deadline.
    ///
    /// On failure the started prefix is rolled back by running its stop
    /// hooks (bounded by the stop deadline); a rollback failure is reported
    /// alongside the original error, never silently dropped. Short-circuits
    /// on the sticky construction error without touching any hook.
    pub async fn start(&self) -> Result<(), AppError> {
        if let Some(err) = &self.error {
            return Err(AppError::Construction(Arc::clone(err)));
        }

        let lifecycle = self.lifecycle.clone();
        let started = run_phase(Phase::Start, self.start_timeout, move |ctx| async move {
            lifecycle.start(ctx).await
        })
        .await;

        let start_error = match started {
            Ok(()) => {
                info!("application started");
                return Ok(());
            }
            Err(err) => err,
        };
        error!(%start_error, "start failed, rolling back");

        let lifecycle = self.lifecycle.clone();
        let rollback = run_phase(Phase::Stop, self.stop_timeout, move |ctx| async move {
            lifecycle.stop(ctx).await
        })
        .await;

        let err = match rollback {
            Ok(()) => AppError::Start {
                source: start_error,
            },
            Err(rollback_error) => {
                error!(%rollback_error, "rollback failed");
                AppError::StartWithFailedRollback {
                    start: start_error,
                    rollback: rollback_error,
                }
            }
        };
        self.notify_observers(&err);
        Err(err)
    }

    /// Run stop hooks for whatever started, in reverse order, bounded by
    /// the stop deadline.
    ///
    /// Safe to call when `start` never ran or failed entirely; that is a
    /// no-op. Short-circuits on the sticky construction error.
    pub async fn stop(&self) -> Result<(), AppError> {
        if let Some(err) = &self.error {
            return Err(AppError::Construction(Arc::clone(err)));
        }

        let lifecycle = self.lifecycle.clone();
        run_phase(Phase::Stop, self.stop_timeout, move |ctx| async move {
            lifecycle.stop(ctx).await
        })
        .await
        .map_err(|source| AppError::Stop { source })
    }

    /// Start the application, block until a termination signal arrives
    /// (from the OS or from a [`Shutdowner`]), then stop it.
    ///
    /// A start failure aborts the run before steady state; a stop failure
    /// is reported after cleanup was attempted.
    pub async fn run(&self) -> Result<(), AppError> {
        let mut done = self.done();
        self.start().await?;
        match done.recv().await {
            Some(signal) => info!(%signal, "shutdown signal received"),
            None => warn!("shutdown channel closed before any signal arrived"),
        }
        self.stop().await
    }

    pub(crate) fn notify_observers(&self, error: &AppError) {
        for observer in &self.observers {
            observer(error);
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("lifecycle", &self.lifecycle)
            .field("start_timeout", &self.start_timeout)
            .field("stop_timeout", &self.stop_timeout)
            .field("construction_error", &self.error)
            .finish_non_exhaustive()
    }
}
