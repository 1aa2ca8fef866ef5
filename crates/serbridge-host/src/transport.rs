//! Client-side transports
//!
//! The host end of a serprog link needs short bounded waits during
//! synchronization, unlike the bridge end, so this is a separate trait from
//! the core's blocking byte transport.

use crate::error::{HostError, Result};

/// Transport trait for reading and writing bytes
pub trait Transport {
    /// Write bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `buf.len()` bytes
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout_ms`
    ///
    /// Returns the number of bytes read, 0 on timeout.
    fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        (**self).read_nonblock(buf, timeout_ms)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use crate::link::frame_format;
    use serbridge_core::{LinkConfig, Parity, StopBits};
    use serialport::{DataBits, FlowControl, SerialPort};
    use std::io::{Read, Write};
    use std::time::Duration;

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open a serial port with the bridge's frame format
        ///
        /// Uses the default 57600 baud when `baud` is not given.
        pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
            let config = match baud {
                Some(b) => LinkConfig::DEFAULT.with_baud(b),
                None => LinkConfig::DEFAULT,
            };

            let port = serialport::new(device, config.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(match config.parity {
                    Parity::None => serialport::Parity::None,
                    Parity::Even => serialport::Parity::Even,
                    Parity::Odd => serialport::Parity::Odd,
                })
                .stop_bits(match config.stop_bits {
                    StopBits::One => serialport::StopBits::One,
                    StopBits::Two => serialport::StopBits::Two,
                })
                .flow_control(FlowControl::None)
                .timeout(Duration::from_secs(5))
                .open()?;

            log::info!(
                "Opened serial port {} at {} baud ({})",
                device,
                config.baud_rate,
                frame_format(&config)
            );

            Ok(Self { port })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.port.read_exact(buf)?;
            Ok(())
        }

        fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
            let old_timeout = self.port.timeout();
            self.port
                .set_timeout(Duration::from_millis(timeout_ms as u64))?;

            let result = match self.port.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if is_timeout(&e) => Ok(0),
                Err(e) => Err(HostError::from(e)),
            };

            self.port.set_timeout(old_timeout)?;
            result
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }
    }
}

pub mod tcp {
    //! TCP socket transport implementation

    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// TCP socket transport
    pub struct TcpTransport {
        stream: TcpStream,
    }

    impl TcpTransport {
        /// Connect to a serprog server at the specified host and port
        pub fn connect(host: &str, port: u16) -> Result<Self> {
            let addr = format!("{}:{}", host, port);
            log::info!("Connecting to serprog server at {}", addr);

            let stream = TcpStream::connect(&addr)
                .map_err(|e| HostError::ConnectionFailed(e.to_string()))?;

            stream.set_nodelay(true).map_err(|e| {
                HostError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
            })?;
            stream
                .set_read_timeout(Some(DEFAULT_TIMEOUT))
                .map_err(|e| {
                    HostError::ConnectionFailed(format!("Failed to set read timeout: {}", e))
                })?;
            stream
                .set_write_timeout(Some(DEFAULT_TIMEOUT))
                .map_err(|e| {
                    HostError::ConnectionFailed(format!("Failed to set write timeout: {}", e))
                })?;

            log::info!("Connected to serprog server at {}", addr);

            Ok(Self { stream })
        }
    }

    impl Transport for TcpTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.stream.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.stream.read_exact(buf)?;
            Ok(())
        }

        fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
            // A zero duration is rejected by set_read_timeout
            let timeout = Duration::from_millis(timeout_ms.max(1) as u64);
            self.stream.set_read_timeout(Some(timeout))?;

            let result = match self.stream.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if is_timeout(&e) => Ok(0),
                Err(e) => Err(HostError::from(e)),
            };

            self.stream.set_read_timeout(Some(DEFAULT_TIMEOUT))?;
            result
        }

        fn flush(&mut self) -> Result<()> {
            self.stream.flush()?;
            Ok(())
        }
    }
}
