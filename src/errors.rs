//! Typed error hierarchy for the armature orchestrator.
//!
//! Three top-level types cover the three subsystems:
//! - `AppError` — orchestrator failures (construction, start, stop)
//! - `PhaseError` — a single start or stop pass failure
//! - `AssemblyError` — structured failures from the external construction
//!   mechanism
//!
//! plus `BroadcastError` for shutdown fan-out and `VisualizeError` for the
//! dependency-graph accessor.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::Phase;
use crate::shutdown::ShutdownSignal;

/// A single stop hook failure collected during best-effort cleanup.
#[derive(Debug)]
pub struct StopFailure {
    /// Origin label of the hook whose stop action failed.
    pub origin: String,
    /// The failure reported by the stop action.
    pub error: anyhow::Error,
}

impl fmt::Display for StopFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.error)
    }
}

fn list_failures(failures: &[StopFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from a single lifecycle phase.
///
/// The start pass fails fast on the first hook error; the stop pass collects
/// every hook error and reports them together. Either pass can instead lose
/// the race against its deadline.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// A start action returned an error; no later hooks were attempted.
    #[error("start hook registered at {origin} failed: {source}")]
    StartHook {
        /// Origin label recorded when the hook was appended.
        origin: String,
        #[source]
        source: anyhow::Error,
    },

    /// One or more stop actions failed. Cleanup still ran to completion;
    /// every failure is enumerated here.
    #[error("{} stop hook(s) failed: {}", .failures.len(), list_failures(.failures))]
    StopHooks {
        /// All collected stop failures, in execution (reverse-registration) order.
        failures: Vec<StopFailure>,
    },

    /// The phase did not settle before its deadline. The phase task keeps
    /// running in the background; it is abandoned, not cancelled.
    #[error("{phase} phase did not complete within {timeout:?}")]
    DeadlineExceeded { phase: Phase, timeout: Duration },

    /// The phase task panicked.
    #[error("{phase} phase task panicked")]
    Panicked { phase: Phase },
}

impl PhaseError {
    /// Whether this failure is a lost deadline race rather than a hook error.
    pub fn is_deadline(&self) -> bool {
        matches!(self, PhaseError::DeadlineExceeded { .. })
    }
}

fn discriminator_suffix(discriminator: &Option<String>) -> String {
    match discriminator {
        Some(d) => format!(" (discriminator {d:?})"),
        None => String::new(),
    }
}

/// Structured failure reported by the external construction mechanism.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A required type has no registered provider.
    #[error("no provider registered for {type_name}{}", discriminator_suffix(.discriminator))]
    MissingProvider {
        type_name: String,
        /// Optional name/group discriminator of the missing instance.
        discriminator: Option<String>,
    },

    /// The declared providers form a cycle.
    #[error("dependency cycle: {path}")]
    DependencyCycle {
        /// Human-readable rendering of the cycle, e.g. `A -> B -> A`.
        path: String,
    },

    /// A constructor ran and reported an error.
    #[error("constructor for {type_name} failed: {source}")]
    Constructor {
        type_name: String,
        #[source]
        source: anyhow::Error,
    },

    /// An invocation ran and reported an error.
    #[error("invocation {name} failed: {source}")]
    Invocation {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// The sticky construction failure recorded by the orchestrator.
///
/// Wraps the assembly's structured error together with a rendering of the
/// dependency graph, when the assembly could produce one for this error.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ConstructionError {
    #[source]
    source: AssemblyError,
    graph: Option<String>,
}

impl ConstructionError {
    pub(crate) fn new(source: AssemblyError, graph: Option<String>) -> Self {
        Self { source, graph }
    }

    /// The underlying assembly failure.
    pub fn assembly_error(&self) -> &AssemblyError {
        &self.source
    }

    /// The dependency-graph rendering attached at construction time.
    pub fn graph(&self) -> Result<&str, VisualizeError> {
        self.graph.as_deref().ok_or(VisualizeError)
    }
}

/// Returned by graph accessors when no dependency graph is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no dependency graph attached to this error")]
pub struct VisualizeError;

/// Orchestrator-level errors returned by `App::start`, `App::stop` and
/// `App::run`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Construction failed before any hook ran. Sticky: every later phase
    /// attempt returns this same first error.
    #[error("construction failed: {0}")]
    Construction(Arc<ConstructionError>),

    /// The start phase failed; rollback unwound the started prefix cleanly.
    #[error("start failed: {source}")]
    Start {
        #[source]
        source: PhaseError,
    },

    /// The start phase failed and the automatic rollback failed too. Both
    /// failures are reported.
    #[error("start failed: {start}; rollback failed: {rollback}")]
    StartWithFailedRollback {
        start: PhaseError,
        rollback: PhaseError,
    },

    /// The stop phase reported failures after best-effort cleanup.
    #[error("stop failed: {source}")]
    Stop {
        #[source]
        source: PhaseError,
    },
}

impl AppError {
    /// The sticky construction failure, when that is what this error is.
    pub fn construction(&self) -> Option<&ConstructionError> {
        match self {
            AppError::Construction(err) => Some(err),
            _ => None,
        }
    }
}

/// The dependency-graph rendering attached to a construction failure.
///
/// Fails with [`VisualizeError`] for any other error kind, or when the
/// assembly could not render a graph for the failure.
pub fn visualize_error(error: &AppError) -> Result<&str, VisualizeError> {
    match error {
        AppError::Construction(err) => err.graph(),
        _ => Err(VisualizeError),
    }
}

/// Partial failure from a shutdown broadcast: some listener slots still held
/// an undelivered signal. Delivery to every other slot was still attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("failed to deliver {signal} signal to {failed} of {total} shutdown listeners")]
pub struct BroadcastError {
    /// The signal that was being broadcast.
    pub signal: ShutdownSignal,
    /// Number of slots that could not accept the signal.
    pub failed: usize,
    /// Total number of registered slots.
    pub total: usize,
}
