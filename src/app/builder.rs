//! Assembling an [`App`] from options, observers and an [`Assembly`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tracing::error;

use super::runner::{App, ErrorObserver};
use crate::assembly::{Assembly, Wiring};
use crate::config::AppOptions;
use crate::errors::{AppError, AssemblyError, ConstructionError};
use crate::lifecycle::Lifecycle;
use crate::shutdown::{Broadcaster, Shutdowner};

/// Builder for [`App`].
///
/// Collects blueprints, invocations, timeouts and error observers, then
/// drives the external construction mechanism in [`AppBuilder::build`].
pub struct AppBuilder<A: Assembly> {
    assembly: A,
    provides: Vec<A::Blueprint>,
    invokes: Vec<A::Blueprint>,
    start_timeout: Duration,
    stop_timeout: Duration,
    observers: Vec<ErrorObserver>,
}

impl<A: Assembly> AppBuilder<A> {
    /// Start a builder around the given construction mechanism.
    pub fn new(assembly: A) -> Self {
        let options = AppOptions::default();
        Self {
            assembly,
            provides: Vec::new(),
            invokes: Vec::new(),
            start_timeout: options.start_timeout(),
            stop_timeout: options.stop_timeout(),
            observers: Vec::new(),
        }
    }

    /// Replace both phase deadlines at once, e.g. from a loaded
    /// [`AppOptions`].
    pub fn options(mut self, options: AppOptions) -> Self {
        self.start_timeout = options.start_timeout();
        self.stop_timeout = options.stop_timeout();
        self
    }

    /// Deadline for the start phase. Defaults to 15 seconds.
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Deadline for the stop phase. Defaults to 15 seconds.
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Observe the terminal construction or start error.
    ///
    /// Observers run in registration order and see the error exactly once.
    pub fn on_error<F>(mut self, observer: F) -> Self
    where
        F: Fn(&AppError) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
        self
    }

    /// Queue a constructor-like value for registration at build time.
    pub fn provide(mut self, blueprint: A::Blueprint) -> Self {
        self.provides.push(blueprint);
        self
    }

    /// Queue an invocation, run eagerly once the graph is built.
    pub fn invoke(mut self, invocation: A::Blueprint) -> Self {
        self.invokes.push(invocation);
        self
    }

    /// Drive the assembly and produce the orchestrator.
    ///
    /// The first assembly error wins: it becomes the sticky construction
    /// error (with the dependency-graph rendering attached when the assembly
    /// can produce one), every error observer sees it once, and later
    /// `start`/`stop` attempts short-circuit on it. An `App` is returned
    /// either way, mirroring the phase methods' short-circuit contract.
    pub fn build(self) -> App {
        let lifecycle = Lifecycle::new();
        let hub = Arc::new(Broadcaster::new());
        let wiring = Wiring::new(lifecycle.clone(), Shutdowner::new(Arc::clone(&hub)));

        let mut assembly = self.assembly;
        let mut first_error: Option<AssemblyError> = None;

        for blueprint in self.provides {
            if first_error.is_some() {
                break;
            }
            first_error = assembly.register(blueprint).err();
        }
        if first_error.is_none() {
            first_error = assembly.build(wiring).err();
        }
        for invocation in self.invokes {
            if first_error.is_some() {
                break;
            }
            first_error = assembly.invoke(invocation).err();
        }

        let error = first_error.map(|source| {
            let graph = assembly.visualize(&source);
            Arc::new(ConstructionError::new(source, graph))
        });

        let app = App {
            lifecycle,
            hub,
            start_timeout: self.start_timeout,
            stop_timeout: self.stop_timeout,
            error,
            observers: self.observers,
            relay_started: AtomicBool::new(false),
        };

        if let Some(err) = &app.error {
            let terminal = AppError::Construction(Arc::clone(err));
            error!(%terminal, "application construction failed");
            app.notify_observers(&terminal);
        }
        app
    }
}
