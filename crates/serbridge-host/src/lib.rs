//! serbridge-host - Host-side serprog plumbing
//!
//! This crate connects the bridge core to the outside world when it runs on
//! a PC instead of a microcontroller, and provides the matching client:
//!
//! - [`link`]: bridge-side TCP and serial links implementing the core's
//!   byte transport through `embedded-io`
//! - [`client`]: a serprog client that synchronizes with a bridge, reads its
//!   capabilities and runs SPI operations
//! - [`connection`]: `dev=`/`ip=` connection strings shared by both sides
//!
//! # Example
//!
//! ```no_run
//! use serbridge_host::SerprogConnection;
//!
//! let conn: SerprogConnection = "ip=127.0.0.1:5555".parse()?;
//! let mut serprog = conn.open_client()?;
//!
//! let mut id = [0u8; 3];
//! serprog.spi_op(&[0x9F], &mut id)?;
//! println!("JEDEC ID: {:02X} {:02X} {:02X}", id[0], id[1], id[2]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod link;
pub mod transport;

pub use client::{ProgrammerInfo, Serprog};
pub use connection::SerprogConnection;
pub use error::{HostError, Result};
pub use link::{SerialLink, StdLink, TcpLink};
pub use transport::serial::SerialTransport;
pub use transport::tcp::TcpTransport;
pub use transport::Transport;
