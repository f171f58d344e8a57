//! Lifecycle orchestration and shutdown coordination for long-running
//! services.
//!
//! Components append paired start/stop hooks while the application is
//! constructed; the orchestrator runs all start actions in registration
//! order, waits for a shutdown trigger (OS signal or explicit request),
//! then runs all stop actions in reverse order, each phase bounded by a
//! deadline and tolerant of partial failure.
//!
//! ```no_run
//! use armature::{AppBuilder, FnAssembly, Hook, wire};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = AppBuilder::new(FnAssembly::new())
//!         .provide(wire(|wiring| {
//!             wiring.lifecycle().append(
//!                 Hook::new()
//!                     .on_start(|_ctx| async { Ok(()) })
//!                     .on_stop(|_ctx| async { Ok(()) })
//!                     .origin("server"),
//!             );
//!             Ok(())
//!         }))
//!         .build();
//!     app.run().await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod assembly;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod shutdown;

pub use app::{App, AppBuilder};
pub use assembly::{Assembly, FnAssembly, Wiring, WiringFn, wire};
pub use config::AppOptions;
pub use errors::{
    AppError, AssemblyError, BroadcastError, ConstructionError, PhaseError, StopFailure,
    VisualizeError, visualize_error,
};
pub use lifecycle::{Hook, HookContext, Lifecycle, Phase};
pub use shutdown::{ShutdownListener, ShutdownSignal, Shutdowner};
