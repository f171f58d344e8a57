//! Core hook types for the lifecycle subsystem.
//!
//! This module defines:
//! - `Phase`: the two lifecycle passes (start and stop)
//! - `Hook`: a paired, optional start/stop action with an origin label
//! - `HookContext`: the deadline-bearing context handed to every action

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;

/// The two lifecycle passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Forward, fail-fast pass over start actions.
    Start,
    /// Reverse, best-effort pass over stop actions.
    Stop,
}

impl Phase {
    /// Returns the phase name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Stop => "stop",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Future returned by a hook action.
pub type HookFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A boxed start or stop action.
///
/// Actions receive a [`HookContext`] and report failure through
/// `anyhow::Error`. Each action is invoked at most once per phase.
pub type HookAction = Arc<dyn Fn(HookContext) -> HookFuture + Send + Sync>;

/// A paired, optional start/stop action with an origin label.
///
/// Hooks are built with the fluent constructors and handed to
/// [`Lifecycle::append`](crate::lifecycle::Lifecycle::append); they are
/// immutable once appended.
///
/// ```
/// use armature::Hook;
///
/// let hook = Hook::new()
///     .on_start(|_ctx| async { Ok(()) })
///     .on_stop(|_ctx| async { Ok(()) })
///     .origin("cache");
/// ```
#[derive(Default)]
pub struct Hook {
    pub(crate) on_start: Option<HookAction>,
    pub(crate) on_stop: Option<HookAction>,
    pub(crate) origin: Option<String>,
}

impl Hook {
    /// Create an empty hook. A hook with neither action still participates
    /// in start accounting (it counts as trivially started once reached).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start action.
    pub fn on_start<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_start = Some(Arc::new(move |ctx| Box::pin(action(ctx))));
        self
    }

    /// Set the stop action.
    pub fn on_stop<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_stop = Some(Arc::new(move |ctx| Box::pin(action(ctx))));
        self
    }

    /// Override the origin label recorded for diagnostics.
    ///
    /// Defaults to the `append` call site.
    pub fn origin(mut self, label: impl Into<String>) -> Self {
        self.origin = Some(label.into());
        self
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .field("origin", &self.origin)
            .finish()
    }
}

/// Execution context handed to every hook action.
///
/// Carries the phase deadline. The phase executor stops waiting once the
/// deadline passes but never cancels the action itself, so long-running
/// actions should observe the deadline (poll [`HookContext::is_expired`] or
/// await [`HookContext::expired`]) and return promptly once it has passed.
#[derive(Debug, Clone, Copy)]
pub struct HookContext {
    phase: Phase,
    deadline: Option<Instant>,
}

impl HookContext {
    /// Context bounded by `timeout` from now.
    pub(crate) fn bounded(phase: Phase, timeout: Duration) -> Self {
        Self {
            phase,
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Context with no deadline.
    pub(crate) fn unbounded(phase: Phase) -> Self {
        Self {
            phase,
            deadline: None,
        }
    }

    /// The phase this action is running in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The absolute deadline, if this context is bounded.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline. `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has already passed.
    pub fn is_expired(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Resolves once the deadline passes. Pending forever when unbounded.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display_names() {
        assert_eq!(Phase::Start.to_string(), "start");
        assert_eq!(Phase::Stop.to_string(), "stop");
    }

    #[test]
    fn hook_debug_shows_which_actions_are_set() {
        let hook = Hook::new().on_start(|_ctx| async { Ok(()) }).origin("db");
        let rendered = format!("{hook:?}");
        assert!(rendered.contains("on_start: true"));
        assert!(rendered.contains("on_stop: false"));
        assert!(rendered.contains("db"));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_context_expires_at_the_deadline() {
        let ctx = HookContext::bounded(Phase::Start, Duration::from_secs(5));
        assert!(!ctx.is_expired());
        assert!(ctx.remaining().unwrap() <= Duration::from_secs(5));

        ctx.expired().await;
        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_context_never_expires() {
        let ctx = HookContext::unbounded(Phase::Stop);
        assert!(!ctx.is_expired());
        assert_eq!(ctx.remaining(), None);

        let expired = tokio::time::timeout(Duration::from_secs(3600), ctx.expired()).await;
        assert!(expired.is_err());
    }
}
