//! Capability queries
//!
//! Each query answers ACK followed by a fixed-size payload. None of them
//! can fail at the protocol level.

use crate::config::DeviceIdentity;
use crate::protocol::{CommandMap, S_ACK};
use crate::transport::ByteTransport;

/// `Q_IFACE`: ACK + interface version, 16-bit little-endian
pub fn report_iface<T: ByteTransport>(link: &mut T, id: &DeviceIdentity) -> Result<(), T::Error> {
    link.send_byte(S_ACK)?;
    link.send_all(&id.iface_version.to_le_bytes())
}

/// `Q_CMDMAP`: ACK + 32-byte map of implemented opcodes
pub fn report_cmdmap<T: ByteTransport>(link: &mut T) -> Result<(), T::Error> {
    const MAP: CommandMap = CommandMap::implemented();
    link.send_byte(S_ACK)?;
    link.send_all(&MAP.bitmap)
}

/// `Q_PGMNAME`: ACK + 16-byte zero-padded name
pub fn report_name<T: ByteTransport>(link: &mut T, id: &DeviceIdentity) -> Result<(), T::Error> {
    link.send_byte(S_ACK)?;
    link.send_all(&id.name)
}

/// `Q_SERBUF`: ACK + serial buffer size, 16-bit little-endian
pub fn report_serbuf<T: ByteTransport>(link: &mut T, id: &DeviceIdentity) -> Result<(), T::Error> {
    link.send_byte(S_ACK)?;
    link.send_all(&id.serbuf_size.to_le_bytes())
}

/// `Q_BUSTYPE`: ACK + supported bus flags
pub fn report_bustype<T: ByteTransport>(link: &mut T, id: &DeviceIdentity) -> Result<(), T::Error> {
    link.send_byte(S_ACK)?;
    link.send_byte(id.bus.bits())
}
