//! Shutdown signal fan-out.
//!
//! Every caller that wants to observe shutdown gets its own single-capacity
//! listener slot. Broadcasting never blocks and never aborts early: a slot
//! that still holds an undelivered signal is counted as missed and the
//! fan-out moves on to the remaining slots.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::BroadcastError;

/// A termination request delivered to shutdown listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownSignal {
    /// Interrupt from the terminal (Ctrl-C / SIGINT).
    Interrupt,
    /// Termination request from the platform (SIGTERM).
    Terminate,
    /// Explicit in-process shutdown request.
    Requested,
}

impl ShutdownSignal {
    /// Returns the signal name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "interrupt",
            ShutdownSignal::Terminate => "terminate",
            ShutdownSignal::Requested => "requested",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fan-out hub over the registered listener slots.
///
/// Slot registration takes the write lock; broadcasting takes the read lock
/// (it mutates slot contents, not the set), so concurrent broadcasts may
/// interleave safely.
#[derive(Default)]
pub(crate) struct Broadcaster {
    slots: RwLock<Vec<mpsc::Sender<ShutdownSignal>>>,
}

impl Broadcaster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new listener slot and return its receiving half.
    pub(crate) fn listen(&self) -> ShutdownListener {
        let (tx, rx) = mpsc::channel(1);
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        ShutdownListener { rx }
    }

    /// Deliver `signal` to every slot without blocking.
    ///
    /// Success only when every slot accepted the signal; otherwise the
    /// returned error reports how many of the total slots were missed, with
    /// delivery to all other slots still having happened.
    pub(crate) fn broadcast(&self, signal: ShutdownSignal) -> Result<(), BroadcastError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut failed = 0;
        for slot in slots.iter() {
            if slot.try_send(signal).is_err() {
                failed += 1;
            }
        }
        debug!(%signal, total = slots.len(), failed, "broadcast shutdown signal");
        if failed == 0 {
            Ok(())
        } else {
            Err(BroadcastError {
                signal,
                failed,
                total: slots.len(),
            })
        }
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Receiving half of a listener slot, returned by `App::done`.
///
/// The slot holds at most one undelivered signal at a time and is never
/// individually unregistered; it lives for the rest of the process.
#[derive(Debug)]
pub struct ShutdownListener {
    rx: mpsc::Receiver<ShutdownSignal>,
}

impl ShutdownListener {
    /// Wait for the next termination signal.
    ///
    /// Returns `None` only if the owning application value was dropped.
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        self.rx.recv().await
    }

    /// Take a pending signal without waiting.
    pub fn try_recv(&mut self) -> Option<ShutdownSignal> {
        self.rx.try_recv().ok()
    }
}

/// Injectable handle for requesting application shutdown.
///
/// Components receive a `Shutdowner` through the construction
/// [`Wiring`](crate::assembly::Wiring) and may clone it freely.
#[derive(Clone)]
pub struct Shutdowner {
    hub: Arc<Broadcaster>,
}

impl Shutdowner {
    pub(crate) fn new(hub: Arc<Broadcaster>) -> Self {
        Self { hub }
    }

    /// Broadcast a termination request to every shutdown listener.
    ///
    /// Equivalent to the process receiving a termination signal. The partial
    /// failure report counts listeners whose previous signal was still
    /// undelivered; the rest were signaled regardless.
    pub fn shutdown(&self) -> Result<(), BroadcastError> {
        self.hub.broadcast(ShutdownSignal::Requested)
    }
}

impl fmt::Debug for Shutdowner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdowner")
            .field("listeners", &self.hub.listener_count())
            .finish()
    }
}
