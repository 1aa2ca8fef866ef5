//! Command dispatcher
//!
//! The dispatcher has a single resting state: waiting for an opcode. Each
//! opcode is handled to completion, including any further bytes its handler
//! reads, before the next one is read. Nothing is carried from one command
//! to the next.
//!
//! Unknown opcodes get no answer at all. Hosts rely on that to resync: they
//! flood `SYNCNOP` until the distinctive NAK+ACK pair comes back, and every
//! stray byte of a broken exchange in front of it is swallowed silently.

use crate::bus::SpiBus;
use crate::bus_config::{self, BusSelection};
use crate::capability;
use crate::config::DeviceIdentity;
use crate::error::{Error, Result};
use crate::protocol::{Command, S_ACK, S_NAK};
use crate::spiop;
use crate::transport::ByteTransport;

/// What happened to one received opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command was recognized and answered
    Handled(Command),
    /// The byte is not an implemented opcode; nothing was sent
    Ignored(u8),
}

/// Owns the link and the bus, and answers one command at a time
pub struct Dispatcher<T, B> {
    link: T,
    bus: B,
    identity: DeviceIdentity,
}

impl<T, B> Dispatcher<T, B>
where
    T: ByteTransport,
    B: SpiBus,
{
    /// Create a dispatcher answering with the given identity
    pub fn new(link: T, bus: B, identity: DeviceIdentity) -> Self {
        Self {
            link,
            bus,
            identity,
        }
    }

    /// Identity reported by the capability queries
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Wait for one opcode and handle it
    pub fn poll(&mut self) -> Result<Outcome, T::Error, B::Error> {
        let opcode = self.link.receive_byte().map_err(Error::Transport)?;
        self.handle(opcode)
    }

    /// Handle an opcode that has already been received
    pub fn handle(&mut self, opcode: u8) -> Result<Outcome, T::Error, B::Error> {
        let Some(cmd) = Command::from_opcode(opcode) else {
            log::trace!("Ignoring opcode 0x{:02X}", opcode);
            return Ok(Outcome::Ignored(opcode));
        };

        log::trace!("{} (0x{:02X})", cmd.name(), opcode);

        let link = &mut self.link;
        let id = &self.identity;
        match cmd {
            Command::Nop => link.send_byte(S_ACK).map_err(Error::Transport)?,
            Command::QueryIface => capability::report_iface(link, id).map_err(Error::Transport)?,
            Command::QueryCmdMap => capability::report_cmdmap(link).map_err(Error::Transport)?,
            Command::QueryPgmName => capability::report_name(link, id).map_err(Error::Transport)?,
            Command::QuerySerBuf => capability::report_serbuf(link, id).map_err(Error::Transport)?,
            Command::QueryBusType => {
                capability::report_bustype(link, id).map_err(Error::Transport)?
            }
            Command::SyncNop => link.send_all(&[S_NAK, S_ACK]).map_err(Error::Transport)?,
            Command::SetBusType => {
                match bus_config::set_bus(link, id).map_err(Error::Transport)? {
                    BusSelection::Accepted => log::debug!("Bus type set to {:?}", id.bus),
                    BusSelection::Rejected(mask) => {
                        log::debug!("Rejected bus type 0x{:02X}", mask)
                    }
                }
            }
            Command::SpiOp => {
                let header = spiop::execute(link, &mut self.bus)?;
                log::trace!(
                    "O_SPIOP done: {} out, {} in",
                    header.write_len,
                    header.read_len
                );
            }
        }

        Ok(Outcome::Handled(cmd))
    }

    /// Serve commands until the link or the bus fails
    ///
    /// On hardware whose peripherals cannot fail this never returns.
    pub fn run(&mut self) -> Result<(), T::Error, B::Error> {
        loop {
            self.poll()?;
        }
    }

    /// Take the link and bus back
    pub fn into_parts(self) -> (T, B) {
        (self.link, self.bus)
    }
}
