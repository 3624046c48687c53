//! Cancellable one-shot Rotate timer

use super::events::BrainEvent;
use crate::error::{Error, Result};
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Armed timer. Dropping the handle cancels it.
pub struct RotateTimer {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    delay: Duration,
}

impl RotateTimer {
    /// Send `RotationElapsed { epoch }` on `events` after `delay`
    pub fn arm(delay: Duration, epoch: u64, events: Sender<BrainEvent>) -> Result<Self> {
        let (cancel, cancelled) = crossbeam_channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("rotate-timer".to_string())
            .spawn(move || match cancelled.recv_timeout(delay) {
                Err(RecvTimeoutError::Timeout) => {
                    log::debug!("Rotate timer for epoch {} elapsed", epoch);
                    if events.send(BrainEvent::RotationElapsed { epoch }).is_err() {
                        log::trace!("Control loop gone, rotate timer event dropped");
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    log::trace!("Rotate timer for epoch {} cancelled", epoch);
                }
            })
            .map_err(|e| Error::Other(format!("Failed to spawn rotate timer: {}", e)))?;

        Ok(Self {
            cancel: Some(cancel),
            handle: Some(handle),
            delay,
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Drop for RotateTimer {
    fn drop(&mut self) {
        // Disconnecting the channel wakes the timer thread
        self.cancel.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Rotate timer thread panicked");
            }
        }
    }
}
