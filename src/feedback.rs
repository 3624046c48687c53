//! Motor feedback delivery
//!
//! A `feedback` thread drains [`FeedbackEvent`]s from the device, stores
//! ticks-per-rotation in the shared cell and forwards auto-stop
//! notifications to the control loop.

use crate::brain::BrainEvent;
use crate::core::shutdown::Shutdown;
use crate::core::types::FeedbackEvent;
use crate::error::{Error, Result};
use crate::motion::TicksPerRotation;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Poll interval for the stop and shutdown flags
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct FeedbackListener {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FeedbackListener {
    pub fn spawn(
        feedback: Receiver<FeedbackEvent>,
        ticks: TicksPerRotation,
        events: Sender<BrainEvent>,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("feedback".to_string())
            .spawn(move || {
                while running_clone.load(Ordering::Acquire) && !shutdown.is_triggered() {
                    match feedback.recv_timeout(POLL_INTERVAL) {
                        Ok(event) => handle_event(event, &ticks, &events),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => {
                            log::debug!("Feedback source closed");
                            break;
                        }
                    }
                }
            })
            .map_err(|e| Error::Other(format!("Failed to spawn feedback thread: {}", e)))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Feedback thread panicked");
            }
        }
    }
}

impl Drop for FeedbackListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_event(event: FeedbackEvent, ticks: &TicksPerRotation, events: &Sender<BrainEvent>) {
    match event {
        FeedbackEvent::TicksPerRotation(value) => {
            if ticks.get() != value {
                log::info!("Ticks per wheel rotation: {}", value);
            }
            ticks.set(value);
        }
        FeedbackEvent::AutoStop(motor) => {
            log::debug!("Motor {} auto-stopped", motor);
            if events.send(BrainEvent::MotorAutoStopped(motor)).is_err() {
                log::trace!("Control loop gone, auto-stop dropped");
            }
        }
    }
}
