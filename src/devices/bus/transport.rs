//! TCP transport for the motor bus
//!
//! One connection carries outbound command frames and inbound feedback
//! frames. Publishing writes under a lock from the control loop; a
//! `bus-reader` thread decodes inbound frames and hands them to a handler.
//!
//! - **Read timeout**: 100 ms so the reader observes shutdown; a frame cut
//!   by the timeout stays buffered until the rest arrives
//! - **Malformed or oversized frames**: connection closed
//! - **Publish failures**: reported to the caller, never retried

use super::codec::{BusMessage, FrameReader, write_frame};
use crate::core::shutdown::Shutdown;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::net::{Shutdown as SocketShutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Reader poll interval
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Bound on a single frame write
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Cloneable handle publishing frames on the shared connection
#[derive(Clone)]
pub struct BusPublisher {
    stream: Arc<Mutex<TcpStream>>,
}

impl BusPublisher {
    /// Fire-and-forget publish
    pub fn publish(&self, message: &BusMessage) -> Result<()> {
        let mut stream = self.stream.lock();
        write_frame(&mut *stream, message)
    }
}

/// Connected motor bus
pub struct TcpBus {
    publisher: BusPublisher,
    stream: TcpStream,
    reader: Option<JoinHandle<()>>,
}

impl TcpBus {
    /// Connect to `address` and start the reader thread.
    ///
    /// `handler` runs on the reader thread for every inbound message. The
    /// reader stops when `shutdown` triggers or the connection drops.
    pub fn connect<F>(
        address: &str,
        connect_timeout: Duration,
        shutdown: Shutdown,
        handler: F,
    ) -> Result<Self>
    where
        F: FnMut(BusMessage) + Send + 'static,
    {
        let addr = resolve(address)?;
        log::info!("Connecting to motor bus at {}", addr);
        let stream = TcpStream::connect_timeout(&addr, connect_timeout).map_err(|e| {
            Error::HardwareInit(format!("Failed to connect to motor bus {}: {}", addr, e))
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            log::warn!("Failed to set TCP_NODELAY: {}", e);
        }
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;

        let mut read_stream = stream.try_clone()?;
        read_stream.set_read_timeout(Some(READ_TIMEOUT))?;
        let publisher = BusPublisher {
            stream: Arc::new(Mutex::new(stream.try_clone()?)),
        };

        let reader = thread::Builder::new()
            .name("bus-reader".to_string())
            .spawn(move || reader_loop(&mut read_stream, &shutdown, handler))
            .map_err(|e| Error::HardwareInit(format!("Failed to spawn bus reader: {}", e)))?;

        log::info!("Motor bus connected");
        Ok(Self {
            publisher,
            stream,
            reader: Some(reader),
        })
    }

    pub fn publisher(&self) -> BusPublisher {
        self.publisher.clone()
    }

    /// Close the connection and join the reader
    pub fn close(&mut self) {
        let _ = self.stream.shutdown(SocketShutdown::Both);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                log::error!("Bus reader thread panicked");
            }
        }
    }
}

impl Drop for TcpBus {
    fn drop(&mut self) {
        self.close();
    }
}

fn resolve(address: &str) -> Result<SocketAddr> {
    address
        .to_socket_addrs()
        .map_err(|e| Error::Config(format!("Invalid bus address {}: {}", address, e)))?
        .next()
        .ok_or_else(|| Error::Config(format!("Bus address {} resolved to nothing", address)))
}

fn reader_loop<F>(stream: &mut TcpStream, shutdown: &Shutdown, mut handler: F)
where
    F: FnMut(BusMessage),
{
    log::debug!("Bus reader started");
    let mut frames = FrameReader::new();

    while !shutdown.is_triggered() {
        match frames.read_frame(stream) {
            Ok(Some(message)) => {
                log::trace!(
                    "Bus message {} ({} bytes)",
                    message.content_type,
                    message.body.len()
                );
                handler(message);
            }
            Ok(None) => {}
            Err(Error::Io(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof
                    || e.kind() == std::io::ErrorKind::ConnectionReset
                    || e.kind() == std::io::ErrorKind::ConnectionAborted =>
            {
                log::info!("Motor bus connection closed");
                break;
            }
            Err(e) => {
                log::error!("Motor bus read failed, closing connection: {}", e);
                let _ = stream.shutdown(SocketShutdown::Both);
                break;
            }
        }
    }

    log::debug!("Bus reader stopped");
}
