//! Connection strings
//!
//! Both ends of a serprog link are named the same way: `dev=<path>[:<baud>]`
//! for a serial port, `ip=<host>:<port>` for TCP. A client connects to the
//! address; a bridge listens on it.

use crate::client::Serprog;
use crate::error::Result;
use crate::transport::serial::SerialTransport;
use crate::transport::tcp::TcpTransport;
use crate::transport::Transport;
use std::fmt;

/// Connection options for serprog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerprogConnection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyUSB0" or "COM1")
        device: String,
        /// Baud rate (None for the 57600 default)
        baud: Option<u32>,
    },
    /// TCP socket connection
    Tcp {
        /// Hostname or IP address
        host: String,
        /// Port number
        port: u16,
    },
}

impl SerprogConnection {
    /// Parse a connection string
    ///
    /// Formats:
    /// - `dev=/dev/ttyUSB0` - Serial with default baud
    /// - `dev=/dev/ttyUSB0:115200` - Serial with specified baud
    /// - `ip=host:port` - TCP connection
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        if let Some(dev) = s.strip_prefix("dev=") {
            if dev.is_empty() {
                return Err("Missing device path in dev= parameter".to_string());
            }
            if let Some((device, baud_str)) = dev.rsplit_once(':') {
                let baud = baud_str
                    .parse()
                    .map_err(|_| format!("Invalid baud rate: {}", baud_str))?;
                Ok(SerprogConnection::Serial {
                    device: device.to_string(),
                    baud: Some(baud),
                })
            } else {
                Ok(SerprogConnection::Serial {
                    device: dev.to_string(),
                    baud: None,
                })
            }
        } else if let Some(ip) = s.strip_prefix("ip=") {
            let (host, port_str) = ip
                .rsplit_once(':')
                .ok_or_else(|| "Missing port in ip= parameter".to_string())?;
            let port = port_str
                .parse()
                .map_err(|_| format!("Invalid port: {}", port_str))?;
            Ok(SerprogConnection::Tcp {
                host: host.to_string(),
                port,
            })
        } else {
            Err(format!(
                "Invalid serprog connection string: {}. Use dev=... or ip=...",
                s
            ))
        }
    }

    /// Open a client connection and initialize the bridge
    pub fn open_client(&self) -> Result<Serprog<Box<dyn Transport>>> {
        let transport: Box<dyn Transport> = match self {
            SerprogConnection::Serial { device, baud } => {
                Box::new(SerialTransport::open(device, *baud)?)
            }
            SerprogConnection::Tcp { host, port } => Box::new(TcpTransport::connect(host, *port)?),
        };
        Serprog::new(transport)
    }
}

impl std::str::FromStr for SerprogConnection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SerprogConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerprogConnection::Serial { device, baud: None } => write!(f, "dev={}", device),
            SerprogConnection::Serial {
                device,
                baud: Some(b),
            } => write!(f, "dev={}:{}", device, b),
            SerprogConnection::Tcp { host, port } => write!(f, "ip={}:{}", host, port),
        }
    }
}
