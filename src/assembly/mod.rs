//! Interface to the external dependency-construction mechanism.
//!
//! The orchestrator never resolves what depends on what. It drives an
//! [`Assembly`] (register constructors, build the graph, run invocations)
//! and captures the first failure as the sticky construction error. While
//! the graph is built, components receive a [`Wiring`] through which they
//! append lifecycle hooks and obtain a [`Shutdowner`]; the linear hook order
//! that results is all the orchestrator ever looks at.

use crate::errors::AssemblyError;
use crate::lifecycle::Lifecycle;
use crate::shutdown::Shutdowner;

/// Capabilities injected into components while the object graph is built.
#[derive(Debug, Clone)]
pub struct Wiring {
    lifecycle: Lifecycle,
    shutdowner: Shutdowner,
}

impl Wiring {
    pub(crate) fn new(lifecycle: Lifecycle, shutdowner: Shutdowner) -> Self {
        Self {
            lifecycle,
            shutdowner,
        }
    }

    /// Registry for start/stop hooks. Hooks run in append order on start
    /// and in reverse order on stop.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Handle components can keep to request application shutdown later.
    pub fn shutdowner(&self) -> Shutdowner {
        self.shutdowner.clone()
    }
}

/// External construction mechanism consumed by
/// [`AppBuilder::build`](crate::app::AppBuilder::build).
///
/// Implementations own provider registration, name/group resolution,
/// singleton caching and cycle detection; the orchestrator only sequences
/// the calls and records the first error. The call order per application is:
/// `register` once per provided blueprint, `build` once, then `invoke` once
/// per invocation, stopping at the first failure.
pub trait Assembly {
    /// Constructor-like value understood by this mechanism.
    type Blueprint;

    /// Record a constructor. Constructors are lazy: they run only when the
    /// types they produce are needed.
    fn register(&mut self, blueprint: Self::Blueprint) -> Result<(), AssemblyError>;

    /// Resolve and validate the object graph, wiring components up with the
    /// given [`Wiring`] as they are constructed.
    fn build(&mut self, wiring: Wiring) -> Result<(), AssemblyError>;

    /// Run an invocation against the built graph. Invocations execute
    /// eagerly and in order.
    fn invoke(&mut self, invocation: Self::Blueprint) -> Result<(), AssemblyError>;

    /// Render the dependency graph for a failed build, when supported.
    fn visualize(&self, error: &AssemblyError) -> Option<String> {
        let _ = error;
        None
    }
}

/// Blueprint type of [`FnAssembly`]: a closure over the construction wiring.
pub type WiringFn = Box<dyn FnOnce(&Wiring) -> Result<(), AssemblyError> + Send>;

/// Box a closure as a [`FnAssembly`] blueprint.
pub fn wire<F>(f: F) -> WiringFn
where
    F: FnOnce(&Wiring) -> Result<(), AssemblyError> + Send + 'static,
{
    Box::new(f)
}

/// Closure-driven construction for applications that wire components by
/// hand.
///
/// No type resolution happens here: blueprints are closures that receive the
/// [`Wiring`] directly. `register` queues a constructor, `build` runs the
/// queued constructors in registration order, and `invoke` runs an
/// invocation immediately against the wired graph.
#[derive(Default)]
pub struct FnAssembly {
    constructors: Vec<WiringFn>,
    wiring: Option<Wiring>,
}

impl FnAssembly {
    /// Create an empty assembly.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Assembly for FnAssembly {
    type Blueprint = WiringFn;

    fn register(&mut self, blueprint: Self::Blueprint) -> Result<(), AssemblyError> {
        self.constructors.push(blueprint);
        Ok(())
    }

    fn build(&mut self, wiring: Wiring) -> Result<(), AssemblyError> {
        for constructor in self.constructors.drain(..) {
            constructor(&wiring)?;
        }
        self.wiring = Some(wiring);
        Ok(())
    }

    fn invoke(&mut self, invocation: Self::Blueprint) -> Result<(), AssemblyError> {
        let wiring = self.wiring.as_ref().ok_or_else(|| AssemblyError::Invocation {
            name: "invoke".into(),
            source: anyhow::anyhow!("assembly has not been built"),
        })?;
        invocation(wiring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::Broadcaster;
    use anyhow::anyhow;
    use std::sync::Arc;

    fn test_wiring() -> Wiring {
        Wiring::new(
            Lifecycle::new(),
            Shutdowner::new(Arc::new(Broadcaster::new())),
        )
    }

    #[test]
    fn build_runs_constructors_in_registration_order() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut assembly = FnAssembly::new();
        for name in ["db", "cache", "server"] {
            let log = log.clone();
            assembly
                .register(wire(move |_wiring| {
                    log.lock().unwrap().push(name);
                    Ok(())
                }))
                .unwrap();
        }

        assembly.build(test_wiring()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["db", "cache", "server"]);
    }

    #[test]
    fn build_stops_at_the_first_constructor_failure() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut assembly = FnAssembly::new();
        let ok_log = log.clone();
        assembly
            .register(wire(move |_wiring| {
                ok_log.lock().unwrap().push("db");
                Ok(())
            }))
            .unwrap();
        assembly
            .register(wire(|_wiring| {
                Err(AssemblyError::Constructor {
                    type_name: "Cache".into(),
                    source: anyhow!("no backing store"),
                })
            }))
            .unwrap();
        let never_log = log.clone();
        assembly
            .register(wire(move |_wiring| {
                never_log.lock().unwrap().push("server");
                Ok(())
            }))
            .unwrap();

        let err = assembly.build(test_wiring()).unwrap_err();
        assert!(matches!(err, AssemblyError::Constructor { .. }));
        assert_eq!(*log.lock().unwrap(), vec!["db"]);
    }

    #[test]
    fn invoke_before_build_is_an_invocation_error() {
        let mut assembly = FnAssembly::new();
        let err = assembly.invoke(wire(|_wiring| Ok(()))).unwrap_err();
        assert!(matches!(err, AssemblyError::Invocation { .. }));
    }

    #[test]
    fn invocations_see_the_wiring() {
        let mut assembly = FnAssembly::new();
        assembly.build(test_wiring()).unwrap();
        assembly
            .invoke(wire(|wiring| {
                assert!(wiring.lifecycle().is_empty());
                Ok(())
            }))
            .unwrap();
    }
}
