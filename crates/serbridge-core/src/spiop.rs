//! `O_SPIOP` transaction executor
//!
//! A transaction is never buffered. Write-phase bytes go from the link to
//! the bus one at a time and read-phase bytes go from the bus to the link
//! one at a time, so the lengths are bounded only by the 24-bit fields.
//!
//! Wire format after the opcode:
//!
//! | Bytes | Meaning |
//! |-------|---------|
//! | 3     | write length, little-endian |
//! | 3     | read length, little-endian |
//! | wlen  | bytes to clock out |
//!
//! Response: ACK once the write phase is done, then `rlen` captured bytes.

use crate::bus::SpiBus;
use crate::error::{Error, Result};
use crate::protocol::{u24_from_le, S_ACK};
use crate::transport::ByteTransport;

/// Byte clocked out during the read phase
pub const READ_FILLER: u8 = 0x00;

/// Decoded length fields of an `O_SPIOP` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiOpHeader {
    /// Bytes to take from the host and clock out
    pub write_len: u32,
    /// Bytes to clock in and send to the host
    pub read_len: u32,
}

impl SpiOpHeader {
    /// Decode the six length bytes
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self {
            write_len: u24_from_le([bytes[0], bytes[1], bytes[2]]),
            read_len: u24_from_le([bytes[3], bytes[4], bytes[5]]),
        }
    }

    fn receive<T: ByteTransport>(link: &mut T) -> core::result::Result<Self, T::Error> {
        let mut bytes = [0u8; 6];
        for b in bytes.iter_mut() {
            *b = link.receive_byte()?;
        }
        Ok(Self::from_bytes(bytes))
    }
}

/// Run one `O_SPIOP` whose opcode has already been consumed
///
/// Reception is held for the whole transaction so that no byte of it can be
/// taken for an opcode. Chip select is asserted once and deasserted once,
/// also when the link or the bus fails midway; the first error wins.
pub fn execute<T, B>(link: &mut T, bus: &mut B) -> Result<SpiOpHeader, T::Error, B::Error>
where
    T: ByteTransport,
    B: SpiBus,
{
    link.hold_reception();
    let result = transact(link, bus);
    link.release_reception();
    result
}

fn transact<T, B>(link: &mut T, bus: &mut B) -> Result<SpiOpHeader, T::Error, B::Error>
where
    T: ByteTransport,
    B: SpiBus,
{
    let header = SpiOpHeader::receive(link).map_err(Error::Transport)?;
    log::trace!(
        "O_SPIOP: write {} bytes, read {} bytes",
        header.write_len,
        header.read_len
    );

    bus.select().map_err(Error::Bus)?;
    let streamed = stream(link, bus, &header);
    let deselected = bus.deselect().map_err(Error::Bus);
    streamed?;
    deselected?;

    Ok(header)
}

fn stream<T, B>(link: &mut T, bus: &mut B, header: &SpiOpHeader) -> Result<(), T::Error, B::Error>
where
    T: ByteTransport,
    B: SpiBus,
{
    for _ in 0..header.write_len {
        let out = link.receive_byte().map_err(Error::Transport)?;
        bus.exchange(out).map_err(Error::Bus)?;
    }

    link.send_byte(S_ACK).map_err(Error::Transport)?;

    for _ in 0..header.read_len {
        let inp = bus.exchange(READ_FILLER).map_err(Error::Bus)?;
        link.send_byte(inp).map_err(Error::Transport)?;
    }

    Ok(())
}
