//! Build-time device identity and serial link settings

use crate::protocol::{BusType, PGMNAME_SIZE, SERBUF_UNBOUNDED, SERPROG_PROTOCOL_VERSION};

/// Static description of the bridge, reported by the capability queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Programmer name, zero padded
    pub name: [u8; PGMNAME_SIZE],
    /// Interface version reported by `Q_IFACE`
    pub iface_version: u16,
    /// Buses this build can drive
    pub bus: BusType,
    /// Serial buffer size reported by `Q_SERBUF`
    pub serbuf_size: u16,
}

impl DeviceIdentity {
    /// Create an identity for an SPI-only, streaming bridge
    ///
    /// Panics (at compile time when used in a `const`) if `name` is longer
    /// than 16 bytes.
    pub const fn new(name: &str) -> Self {
        Self {
            name: pad_name(name),
            iface_version: SERPROG_PROTOCOL_VERSION,
            bus: BusType::SPI,
            serbuf_size: SERBUF_UNBOUNDED,
        }
    }

    /// Get the name without its zero padding
    pub fn name_str(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(PGMNAME_SIZE);
        core::str::from_utf8(&self.name[..len]).unwrap_or("(invalid)")
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        DEFAULT_IDENTITY
    }
}

/// Identity of the stock build
pub const DEFAULT_IDENTITY: DeviceIdentity = DeviceIdentity::new("serbridge");

const fn pad_name(name: &str) -> [u8; PGMNAME_SIZE] {
    let bytes = name.as_bytes();
    assert!(
        bytes.len() <= PGMNAME_SIZE,
        "programmer name must fit in 16 bytes"
    );
    let mut out = [0u8; PGMNAME_SIZE];
    let mut i = 0;
    while i < bytes.len() {
        out[i] = bytes[i];
        i += 1;
    }
    out
}

/// UART parity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// No parity bit
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// UART stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    /// One stop bit
    One,
    /// Two stop bits
    Two,
}

/// Serial link frame settings
///
/// Both ends must agree; host tools are configured with the same values the
/// firmware is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits per frame
    pub data_bits: u8,
    /// Parity
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
}

/// Default link speed
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

impl LinkConfig {
    /// Default frame format: 57600 baud, 8 data bits, no parity, 2 stop bits
    pub const DEFAULT: LinkConfig = LinkConfig {
        baud_rate: DEFAULT_BAUD_RATE,
        data_bits: 8,
        parity: Parity::None,
        stop_bits: StopBits::Two,
    };

    /// Whether a UART can frame `data_bits` (5 to 8)
    pub const fn has_valid_data_bits(&self) -> bool {
        matches!(self.data_bits, 5..=8)
    }

    /// Same frame format at a different speed
    pub const fn with_baud(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
