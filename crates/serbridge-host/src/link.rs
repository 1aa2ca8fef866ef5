//! Bridge-side links
//!
//! These carry the device end of the protocol when the bridge core runs on
//! a host: a TCP connection accepted from a flashing tool, or a serial port
//! wired to one. Both block without timeout, like the firmware's UART.

use crate::error::{HostError, Result};
use serbridge_core::{IoTransport, LinkConfig, Parity, StopBits};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

/// Output is pushed to the stream once this much is pending
const WRITE_CHUNK: usize = 4096;

/// Poll interval for serial reads; a timeout just means "keep waiting"
const SERIAL_POLL: Duration = Duration::from_secs(1);

/// `embedded-io` view of a `std::io` stream
///
/// Writes are gathered and handed to the stream on flush or once a chunk
/// is full. Timeouts from the stream are retried, so reads block until a
/// byte arrives or the peer goes away.
pub struct StdLink<S> {
    stream: S,
    pending: Vec<u8>,
}

impl<S: Read + Write> StdLink<S> {
    /// Wrap a stream
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Vec::with_capacity(WRITE_CHUNK),
        }
    }

    /// Get a reference to the wrapped stream
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Unwrap the stream, dropping unflushed output
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn push_pending(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            self.stream.write_all(&self.pending)?;
            self.pending.clear();
        }
        Ok(())
    }
}

impl<S> embedded_io::ErrorType for StdLink<S> {
    type Error = std::io::Error;
}

impl<S: Read + Write> embedded_io::Read for StdLink<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            match self.stream.read(buf) {
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    continue
                }
                other => return other,
            }
        }
    }
}

impl<S: Read + Write> embedded_io::Write for StdLink<S> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        if self.pending.len() >= WRITE_CHUNK {
            self.push_pending()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.push_pending()?;
        self.stream.flush()
    }
}

/// Byte transport over a TCP connection
pub type TcpLink = IoTransport<StdLink<TcpStream>>;

/// Byte transport over a serial port
pub type SerialLink = IoTransport<StdLink<Box<dyn SerialPort>>>;

/// Bind a listener for flashing tools to connect to
pub fn listen(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .map_err(|e| HostError::ConnectionFailed(format!("Failed to bind {}: {}", addr, e)))?;
    log::info!("Listening for serprog clients on {}", listener.local_addr()?);
    Ok(listener)
}

/// Wait for the next client and wrap its connection
pub fn accept(listener: &TcpListener) -> Result<TcpLink> {
    let (stream, peer) = listener.accept()?;

    // Responses are single bytes; don't let Nagle hold them back
    stream.set_nodelay(true).map_err(|e| {
        HostError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
    })?;

    log::info!("Client connected from {}", peer);
    Ok(IoTransport::new(StdLink::new(stream)))
}

/// Open a serial port with the given frame settings
pub fn open_serial(device: &str, config: &LinkConfig) -> Result<SerialLink> {
    let port = serialport::new(device, config.baud_rate)
        .data_bits(data_bits(config.data_bits)?)
        .parity(match config.parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        })
        .stop_bits(match config.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        })
        .flow_control(serialport::FlowControl::None)
        .timeout(SERIAL_POLL)
        .open()?;

    log::info!(
        "Opened serial port {} at {} baud ({})",
        device,
        config.baud_rate,
        frame_format(config)
    );

    Ok(IoTransport::new(StdLink::new(port)))
}

fn data_bits(bits: u8) -> Result<serialport::DataBits> {
    match bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        n => Err(HostError::InvalidParameter(format!(
            "Unsupported data bits: {}",
            n
        ))),
    }
}

/// Short frame description such as `8N2`
pub fn frame_format(config: &LinkConfig) -> String {
    let parity = match config.parity {
        Parity::None => 'N',
        Parity::Even => 'E',
        Parity::Odd => 'O',
    };
    let stop = match config.stop_bits {
        StopBits::One => 1,
        StopBits::Two => 2,
    };
    format!("{}{}{}", config.data_bits, parity, stop)
}
