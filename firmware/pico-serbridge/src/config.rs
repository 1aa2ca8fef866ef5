//! Build-time configuration
//!
//! ## Pin Assignments
//!
//! | Pin    | Function          |
//! |--------|-------------------|
//! | GP0    | UART0 TX (to host)|
//! | GP1    | UART0 RX (from host) |
//! | GP16   | SPI0 RX (MISO)    |
//! | GP17   | CS (GPIO, active low) |
//! | GP18   | SPI0 SCK          |
//! | GP19   | SPI0 TX (MOSI)    |

use serbridge_core::{DeviceIdentity, LinkConfig};

/// Identity reported to the host
pub const IDENTITY: DeviceIdentity = DeviceIdentity::new("pico-serbridge");

/// Host link frame format: 57600 baud, 8N2
pub const LINK: LinkConfig = LinkConfig::DEFAULT;
const _: () = assert!(LINK.has_valid_data_bits(), "UART data bits must be 5 to 8");

/// SPI clock (mode 0)
pub const SPI_FREQUENCY: u32 = 8_000_000;
