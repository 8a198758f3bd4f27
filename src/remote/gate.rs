//! Single-flight gate around the transport's request channel.
//!
//! The transport can only carry one request at a time. Every synchronous
//! call holds a [`GatePermit`] for its whole round trip; the permit opens the
//! gate again when dropped, including on early return or panic.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::{vlog_trace, Error, Result};

#[derive(Debug, Default)]
pub struct RequestGate {
    busy: Mutex<bool>,
    released: Condvar,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the gate for one request.
    ///
    /// With `blocking` the caller waits for the current holder to finish.
    /// Without it a closed gate fails straight away with
    /// [`Error::TransportBusy`]; pings use this form so a slow request never
    /// queues a backlog of them.
    pub fn acquire(&self, blocking: bool) -> Result<GatePermit<'_>> {
        let mut busy = self.lock();
        if *busy {
            if !blocking {
                vlog_trace!("gate: busy, not waiting");
                return Err(Error::TransportBusy);
            }
            while *busy {
                busy = self
                    .released
                    .wait(busy)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        *busy = true;
        Ok(GatePermit { gate: self })
    }

    pub fn try_acquire(&self) -> Result<GatePermit<'_>> {
        self.acquire(false)
    }

    pub fn is_busy(&self) -> bool {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        *self.lock() = false;
        self.released.notify_one();
    }
}

/// Proof that the caller owns the request channel.
#[derive(Debug)]
#[must_use = "the gate reopens as soon as the permit is dropped"]
pub struct GatePermit<'a> {
    gate: &'a RequestGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
