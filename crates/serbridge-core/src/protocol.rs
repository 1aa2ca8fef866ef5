//! Serprog protocol constants and types
//!
//! Based on the Serial Flasher Protocol Specification version 1.

use bitflags::bitflags;

/// Protocol version we speak
pub const SERPROG_PROTOCOL_VERSION: u16 = 1;

/// ACK response byte
pub const S_ACK: u8 = 0x06;
/// NAK response byte
pub const S_NAK: u8 = 0x15;

// Command opcodes
/// No operation
pub const S_CMD_NOP: u8 = 0x00;
/// Query interface version
pub const S_CMD_Q_IFACE: u8 = 0x01;
/// Query supported commands bitmap
pub const S_CMD_Q_CMDMAP: u8 = 0x02;
/// Query programmer name
pub const S_CMD_Q_PGMNAME: u8 = 0x03;
/// Query serial buffer size
pub const S_CMD_Q_SERBUF: u8 = 0x04;
/// Query supported bustypes
pub const S_CMD_Q_BUSTYPE: u8 = 0x05;
/// Query connected address lines
pub const S_CMD_Q_CHIPSIZE: u8 = 0x06;
/// Query operation buffer size
pub const S_CMD_Q_OPBUF: u8 = 0x07;
/// Query maximum write-n length
pub const S_CMD_Q_WRNMAXLEN: u8 = 0x08;
/// Read a single byte
pub const S_CMD_R_BYTE: u8 = 0x09;
/// Read n bytes
pub const S_CMD_R_NBYTES: u8 = 0x0A;
/// Initialize operation buffer
pub const S_CMD_O_INIT: u8 = 0x0B;
/// Write to opbuf: Write byte with address
pub const S_CMD_O_WRITEB: u8 = 0x0C;
/// Write to opbuf: Write-N
pub const S_CMD_O_WRITEN: u8 = 0x0D;
/// Write opbuf: delay
pub const S_CMD_O_DELAY: u8 = 0x0E;
/// Execute operation buffer
pub const S_CMD_O_EXEC: u8 = 0x0F;
/// Special no-operation that returns NAK+ACK (for synchronization)
pub const S_CMD_SYNCNOP: u8 = 0x10;
/// Query maximum read-n length
pub const S_CMD_Q_RDNMAXLEN: u8 = 0x11;
/// Set used bustype(s)
pub const S_CMD_S_BUSTYPE: u8 = 0x12;
/// Perform SPI operation
pub const S_CMD_O_SPIOP: u8 = 0x13;
/// Set SPI clock frequency
pub const S_CMD_S_SPI_FREQ: u8 = 0x14;
/// Enable/disable output drivers
pub const S_CMD_S_PIN_STATE: u8 = 0x15;
/// Set SPI chip select to use
pub const S_CMD_S_SPI_CS: u8 = 0x16;
/// Set SPI mode (half/full duplex)
pub const S_CMD_S_SPI_MODE: u8 = 0x17;
/// Set CS mode (auto/selected/deselected)
pub const S_CMD_S_CS_MODE: u8 = 0x18;

/// Number of bytes in the command map bitmap
pub const CMDMAP_SIZE: usize = 32;

/// Length of the programmer name field
pub const PGMNAME_SIZE: usize = 16;

/// Serial buffer size meaning "no limit, transfers are streamed"
pub const SERBUF_UNBOUNDED: u16 = 0xFFFF;

/// Largest length encodable in an `O_SPIOP` length field
pub const MAX_U24: u32 = (1 << 24) - 1;

bitflags! {
    /// Bus type flags
    ///
    /// Reported by `Q_BUSTYPE` and requested by `S_BUSTYPE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BusType: u8 {
        /// Parallel bus
        const PARALLEL = 1 << 0;
        /// LPC bus
        const LPC      = 1 << 1;
        /// FWH bus
        const FWH      = 1 << 2;
        /// SPI bus
        const SPI      = 1 << 3;

        /// Non-SPI buses (PARALLEL | LPC | FWH)
        const NONSPI = Self::PARALLEL.bits() | Self::LPC.bits() | Self::FWH.bits();
    }
}

/// Commands implemented by the bridge
///
/// Every variant has a handler in the dispatcher and a bit in the command
/// map. Opcodes without a variant are silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// `S_CMD_NOP`: ACK
    Nop = S_CMD_NOP,
    /// `S_CMD_Q_IFACE`: ACK + 16-bit interface version
    QueryIface = S_CMD_Q_IFACE,
    /// `S_CMD_Q_CMDMAP`: ACK + 32-byte command bitmap
    QueryCmdMap = S_CMD_Q_CMDMAP,
    /// `S_CMD_Q_PGMNAME`: ACK + 16-byte name
    QueryPgmName = S_CMD_Q_PGMNAME,
    /// `S_CMD_Q_SERBUF`: ACK + 16-bit serial buffer size
    QuerySerBuf = S_CMD_Q_SERBUF,
    /// `S_CMD_Q_BUSTYPE`: ACK + bus flags
    QueryBusType = S_CMD_Q_BUSTYPE,
    /// `S_CMD_SYNCNOP`: NAK + ACK
    SyncNop = S_CMD_SYNCNOP,
    /// `S_CMD_S_BUSTYPE`: ACK or NAK
    SetBusType = S_CMD_S_BUSTYPE,
    /// `S_CMD_O_SPIOP`: streamed SPI transaction
    SpiOp = S_CMD_O_SPIOP,
}

impl Command {
    /// Every implemented command, in opcode order
    pub const ALL: [Command; 9] = [
        Command::Nop,
        Command::QueryIface,
        Command::QueryCmdMap,
        Command::QueryPgmName,
        Command::QuerySerBuf,
        Command::QueryBusType,
        Command::SyncNop,
        Command::SetBusType,
        Command::SpiOp,
    ];

    /// Wire opcode of this command
    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Decode an opcode byte, `None` if the bridge does not implement it
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|cmd| cmd.opcode() == opcode)
    }

    /// Short protocol name, for logging
    pub const fn name(self) -> &'static str {
        match self {
            Command::Nop => "NOP",
            Command::QueryIface => "Q_IFACE",
            Command::QueryCmdMap => "Q_CMDMAP",
            Command::QueryPgmName => "Q_PGMNAME",
            Command::QuerySerBuf => "Q_SERBUF",
            Command::QueryBusType => "Q_BUSTYPE",
            Command::SyncNop => "SYNCNOP",
            Command::SetBusType => "S_BUSTYPE",
            Command::SpiOp => "O_SPIOP",
        }
    }
}

/// Supported commands bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMap {
    /// Raw bitmap of supported commands, bit `i` of byte `i / 8` is opcode `i`
    pub bitmap: [u8; CMDMAP_SIZE],
}

impl CommandMap {
    /// Create an empty command map
    pub const fn new() -> Self {
        Self {
            bitmap: [0; CMDMAP_SIZE],
        }
    }

    /// Build a command map from a list of commands
    pub const fn from_commands(commands: &[Command]) -> Self {
        let mut bitmap = [0u8; CMDMAP_SIZE];
        let mut i = 0;
        while i < commands.len() {
            let op = commands[i].opcode();
            bitmap[(op / 8) as usize] |= 1 << (op % 8);
            i += 1;
        }
        Self { bitmap }
    }

    /// The map advertised by this bridge: exactly [`Command::ALL`]
    pub const fn implemented() -> Self {
        Self::from_commands(&Command::ALL)
    }

    /// Check if a command is supported
    pub fn is_supported(&self, cmd: u8) -> bool {
        let byte_idx = (cmd / 8) as usize;
        let bit_idx = cmd % 8;
        if byte_idx >= CMDMAP_SIZE {
            return false;
        }
        (self.bitmap[byte_idx] & (1 << bit_idx)) != 0
    }

    /// Iterate over the opcodes set in the map
    pub fn opcodes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |&op| self.is_supported(op))
    }
}

impl Default for CommandMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a 24-bit little-endian value
pub const fn u24_from_le(buf: [u8; 3]) -> u32 {
    (buf[0] as u32) | ((buf[1] as u32) << 8) | ((buf[2] as u32) << 16)
}

/// Encode the low 24 bits of `value` little-endian
pub const fn u24_to_le(value: u32) -> [u8; 3] {
    [
        (value & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        ((value >> 16) & 0xFF) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmdmap_mirrors_commands() {
        let map = CommandMap::implemented();
        for op in 0..=u8::MAX {
            assert_eq!(
                map.is_supported(op),
                Command::from_opcode(op).is_some(),
                "opcode 0x{:02X}",
                op
            );
        }
    }

    #[test]
    fn test_cmdmap_wire_bytes() {
        let map = CommandMap::implemented();
        assert_eq!(&map.bitmap[..4], &[0x3F, 0x00, 0x0D, 0x00]);
        assert!(map.bitmap[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_unimplemented_opcodes() {
        for op in [
            S_CMD_Q_CHIPSIZE,
            S_CMD_Q_OPBUF,
            S_CMD_Q_WRNMAXLEN,
            S_CMD_R_BYTE,
            S_CMD_R_NBYTES,
            S_CMD_O_INIT,
            S_CMD_O_WRITEB,
            S_CMD_O_WRITEN,
            S_CMD_O_DELAY,
            S_CMD_O_EXEC,
            S_CMD_Q_RDNMAXLEN,
            S_CMD_S_SPI_FREQ,
            S_CMD_S_PIN_STATE,
        ] {
            assert_eq!(Command::from_opcode(op), None);
        }
    }

    #[test]
    fn test_command_opcodes() {
        assert_eq!(Command::from_opcode(0x13), Some(Command::SpiOp));
        assert_eq!(Command::SyncNop.opcode(), 0x10);
        assert_eq!(Command::SetBusType.name(), "S_BUSTYPE");
    }

    #[test]
    fn test_u24() {
        assert_eq!(u24_from_le([0x01, 0x00, 0x00]), 1);
        assert_eq!(u24_from_le([0x56, 0x34, 0x12]), 0x123456);
        assert_eq!(u24_from_le([0xFF, 0xFF, 0xFF]), MAX_U24);
        assert_eq!(u24_to_le(0x123456), [0x56, 0x34, 0x12]);
        assert_eq!(u24_to_le(0x0100_0002), [0x02, 0x00, 0x00]);
    }

    #[test]
    fn test_bustype_flags() {
        assert_eq!(BusType::SPI.bits(), 0x08);
        assert_eq!(BusType::NONSPI.bits(), 0x07);
        assert!(!BusType::NONSPI.contains(BusType::SPI));
    }
}
