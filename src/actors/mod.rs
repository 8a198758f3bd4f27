//! Actor system for background tasks.
//!
//! Each actor is an independent tokio task that talks to the logic thread
//! by message passing. Today that is only the auto-connect [`TickActor`].
//!
//! NOTE: Keyboard input is handled synchronously in the logic thread,
//! not via an actor, for minimum latency. Notifications from the target
//! arrive on their own channel, filled by the transport's delivery thread.

pub mod ticker;

use tokio_util::sync::CancellationToken;

pub use ticker::TickActor;

/// Handle to a running actor, used for graceful shutdown.
pub struct ActorHandle {
    cancel: CancellationToken,
}

impl ActorHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Signal the actor to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
