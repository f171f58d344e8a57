//! Shutdown coordination subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdowner::shutdown() ─┐
//!                         ├─→ Broadcaster ─→ listener slots (capacity 1 each)
//! SIGINT / SIGTERM ───────┘       non-blocking try-send, count-only misses
//! ```
//!
//! # Design Decisions
//! - One single-capacity slot per listener; at most one undelivered signal
//! - Broadcast never blocks on a slow consumer and never aborts early
//! - OS signals and explicit requests are indistinguishable downstream

mod broadcaster;
mod signals;

pub(crate) use broadcaster::Broadcaster;
pub use broadcaster::{ShutdownListener, ShutdownSignal, Shutdowner};
pub(crate) use signals::spawn_relay;
