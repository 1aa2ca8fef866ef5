//! `S_BUSTYPE` handling

use crate::config::DeviceIdentity;
use crate::protocol::{BusType, S_ACK, S_NAK};
use crate::transport::ByteTransport;

/// Result of a bus selection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSelection {
    /// The requested mask equals the supported one
    Accepted,
    /// Anything else; carries the raw requested mask
    Rejected(u8),
}

/// Read the requested mask and answer ACK on an exact match, NAK otherwise
///
/// Subsets, supersets and zero are all rejected.
pub fn set_bus<T: ByteTransport>(
    link: &mut T,
    id: &DeviceIdentity,
) -> Result<BusSelection, T::Error> {
    let requested = link.receive_byte()?;
    let selection = check(requested, id.bus);
    match selection {
        BusSelection::Accepted => link.send_byte(S_ACK)?,
        BusSelection::Rejected(_) => link.send_byte(S_NAK)?,
    }
    Ok(selection)
}

fn check(requested: u8, supported: BusType) -> BusSelection {
    if requested == supported.bits() {
        BusSelection::Accepted
    } else {
        BusSelection::Rejected(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_IDENTITY;
    use crate::mock::{Log, MockLink};

    fn request(mask: u8) -> (BusSelection, Vec<u8>) {
        let log = Log::new();
        let mut link = MockLink::new(&[mask], &log);
        let sel = set_bus(&mut link, &DEFAULT_IDENTITY).unwrap();
        (sel, log.output())
    }

    #[test]
    fn test_spi_accepted() {
        assert_eq!(request(0x08), (BusSelection::Accepted, vec![S_ACK]));
    }

    #[test]
    fn test_everything_else_rejected() {
        for mask in [0x00, 0x01, 0x02, 0x04, 0x07, 0x09, 0x0F, 0xFF] {
            assert_eq!(request(mask), (BusSelection::Rejected(mask), vec![S_NAK]));
        }
    }
}
