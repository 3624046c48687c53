//! Process-wide stop request
//!
//! A cloneable flag handed to every blocking call. SIGINT/SIGTERM set it via
//! [`Shutdown::install_signal_handler`].

use crate::error::{Error, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of [`Shutdown::sleep`]
const SLEEP_SLICE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once shutdown was requested
    pub fn check(&self) -> Result<()> {
        if self.is_triggered() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early on shutdown.
    ///
    /// Returns `false` if shutdown interrupted the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    /// Spawn a thread that triggers shutdown on SIGINT or SIGTERM
    pub fn install_signal_handler(&self) -> Result<()> {
        let mut signals = Signals::new([SIGINT, SIGTERM])
            .map_err(|e| Error::Other(format!("Failed to register signal handlers: {}", e)))?;
        let shutdown = self.clone();

        thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    log::info!("Received signal {}, initiating shutdown...", sig);
                    shutdown.trigger();
                }
            })
            .map_err(|e| Error::Other(format!("Failed to spawn signal handler thread: {}", e)))?;

        Ok(())
    }
}
