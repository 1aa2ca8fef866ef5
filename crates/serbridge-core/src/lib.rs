//! serbridge-core - serprog bridge core
//!
//! This crate implements the device side of the Serial Flasher Protocol
//! (serprog): a byte-oriented command/response protocol that lets a host
//! flashing tool drive an SPI chip through a microcontroller.
//!
//! The host never touches the SPI bus directly. It sends opcodes over a
//! serial link, and the [`Dispatcher`] answers capability queries, accepts
//! or rejects bus selections, and executes SPI transactions whose write and
//! read phases are streamed byte by byte between the link and the bus.
//!
//! # Features
//!
//! - `std` - Enable `std::error::Error` impls and `embedded-io`'s std support
//!
//! # Example
//!
//! ```ignore
//! use serbridge_core::{Dispatcher, HalBus, IoTransport, DEFAULT_IDENTITY};
//!
//! let link = IoTransport::new(uart);
//! let bus = HalBus::new(spi, cs)?;
//! let mut dispatcher = Dispatcher::new(link, bus, DEFAULT_IDENTITY);
//! dispatcher.run()?;
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod bus_config;
pub mod capability;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod spiop;
pub mod transport;

#[cfg(test)]
mod mock;

pub use bus::{HalBus, SpiBus};
pub use bus_config::BusSelection;
pub use config::{DeviceIdentity, LinkConfig, Parity, StopBits, DEFAULT_IDENTITY};
pub use dispatcher::{Dispatcher, Outcome};
pub use error::{Error, HalBusError, LinkError, Result};
pub use protocol::{BusType, Command, CommandMap};
pub use spiop::SpiOpHeader;
pub use transport::{ByteTransport, IoTransport};
