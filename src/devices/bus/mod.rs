//! Distributed binding: wheel motors behind a message-bus motor daemon
//!
//! Commands go out as tagged frames, feedback (ticks per rotation, motor
//! auto-stop) comes back on the same connection.

pub mod actuator;
pub mod codec;
pub mod transport;

pub use actuator::BusActuator;
pub use codec::{BusMessage, decode_feedback};
pub use transport::{BusPublisher, TcpBus};

use crate::config::BusConfig;
use crate::core::shutdown::Shutdown;
use crate::core::types::FeedbackEvent;
use crate::error::Result;
use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;

/// Connect and route decoded feedback into the returned channel
pub fn connect(config: &BusConfig, shutdown: Shutdown) -> Result<(TcpBus, Receiver<FeedbackEvent>)> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let bus = TcpBus::connect(
        &config.address,
        Duration::from_millis(config.connect_timeout_ms),
        shutdown,
        move |message| forward_feedback(&message, &tx),
    )?;
    Ok((bus, rx))
}

/// Decode one inbound message; unknown tags and bad bodies are logged and dropped
pub fn forward_feedback(message: &BusMessage, tx: &Sender<FeedbackEvent>) {
    match decode_feedback(message) {
        Ok(Some(event)) => {
            if tx.send(event).is_err() {
                log::trace!("Feedback receiver dropped");
            }
        }
        Ok(None) => log::debug!("Ignoring bus message {}", message.content_type),
        Err(e) => log::warn!("Dropping malformed feedback: {}", e),
    }
}
