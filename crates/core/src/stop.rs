// Synchronous stop on top of the engine's asynchronous stop

use crate::error::Result;
use parking_lot::{Condvar, Mutex};

/// Turns the asynchronous "stopped" notification into a blocking call.
///
/// The flag starts out set: a fresh player is stopped. The mutex only guards
/// the flag. It is never held while the stop request is enqueued, and the
/// condition variable releases it while waiting, so the event thread can always
/// take it to signal completion.
pub struct SyncStopCoordinator {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl SyncStopCoordinator {
    pub fn new() -> Self {
        Self {
            stopped: Mutex::new(true),
            cond: Condvar::new(),
        }
    }

    /// Clear the flag ahead of a stop request.
    pub fn start(&self) {
        *self.stopped.lock() = false;
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Enqueue an asynchronous stop and block until it completes.
    ///
    /// The flag is cleared before `enqueue` runs, so a completion that fires
    /// before the wait begins is still observed. If the request cannot be
    /// enqueued there is nothing to wait for and the player counts as stopped.
    pub fn request_stop<F>(&self, enqueue: F)
    where
        F: FnOnce() -> Result<()>,
    {
        self.start();

        if let Err(err) = enqueue() {
            log::warn!("Stop request not enqueued, treating player as stopped: {}", err);
            self.on_stopped_event();
            return;
        }

        let mut stopped = self.stopped.lock();
        while !*stopped {
            self.cond.wait(&mut stopped);
        }
        log::debug!("Asynchronous stop completed");
    }

    /// Completion notification from the event path. Duplicates are ignored.
    pub fn on_stopped_event(&self) {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            *stopped = true;
            self.cond.notify_all();
        }
    }
}

impl Default for SyncStopCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
