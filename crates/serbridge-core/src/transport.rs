//! Byte transport between the host and the bridge
//!
//! The protocol is consumed one byte at a time: the opcode byte alone
//! decides how many more bytes a handler reads. Both directions block with
//! no timeout, so a host that stops talking mid-request stalls the bridge
//! until it is reset.

use crate::error::LinkError;
use embedded_io::Error as _;

/// Blocking single-byte link to the host
pub trait ByteTransport {
    /// Error reported by the link
    type Error: core::fmt::Debug;

    /// Send one byte, blocking until the link accepts it
    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Receive one byte, blocking until one has fully arrived
    ///
    /// Only call this when the protocol says a byte is due.
    fn receive_byte(&mut self) -> Result<u8, Self::Error>;

    /// Send a sequence of bytes
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        for &b in bytes {
            self.send_byte(b)?;
        }
        Ok(())
    }

    /// Push out anything the link buffers internally
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Stop new opcodes from being delivered to the dispatcher
    ///
    /// Interrupt-driven transports mask their receive interrupt here. Bytes
    /// requested through [`receive_byte`](Self::receive_byte) must still be
    /// delivered while reception is held.
    fn hold_reception(&mut self) {}

    /// Undo [`hold_reception`](Self::hold_reception)
    fn release_reception(&mut self) {}
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    type Error = T::Error;

    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        (**self).send_byte(byte)
    }

    fn receive_byte(&mut self) -> Result<u8, Self::Error> {
        (**self).receive_byte()
    }

    fn send_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).send_all(bytes)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }

    fn hold_reception(&mut self) {
        (**self).hold_reception()
    }

    fn release_reception(&mut self) {
        (**self).release_reception()
    }
}

/// [`ByteTransport`] over any `embedded-io` reader/writer
///
/// Pending output is flushed before every blocking read, so the response to
/// one request is always on the wire before the bridge waits for the next.
pub struct IoTransport<T> {
    io: T,
}

impl<T> IoTransport<T> {
    /// Wrap an `embedded-io` stream
    pub fn new(io: T) -> Self {
        Self { io }
    }

    /// Get a reference to the wrapped stream
    pub fn inner(&self) -> &T {
        &self.io
    }

}

impl<T> ByteTransport for IoTransport<T>
where
    T: embedded_io::Read + embedded_io::Write,
{
    type Error = LinkError<T::Error>;

    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.send_all(&[byte])
    }

    fn receive_byte(&mut self) -> Result<u8, Self::Error> {
        self.io.flush().map_err(LinkError::Io)?;

        let mut buf = [0u8; 1];
        loop {
            match self.io.read(&mut buf) {
                Ok(0) => return Err(LinkError::Closed),
                Ok(_) => return Ok(buf[0]),
                Err(e) if e.kind() == embedded_io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Io(e)),
            }
        }
    }

    fn send_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.io.write_all(bytes).map_err(LinkError::Io)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.io.flush().map_err(LinkError::Io)
    }
}
