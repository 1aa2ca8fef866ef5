//! Error types for serbridge-core
//!
//! The protocol itself has no error path beyond NAK: a stalled bus or a
//! silent host simply blocks. These types only carry failures reported by
//! the transport and bus implementations underneath the dispatcher.

use core::fmt;

/// Dispatcher error, generic over the transport error `T` and bus error `B`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<T, B> {
    /// The byte transport failed to send or receive
    Transport(T),
    /// The SPI bus failed to select, deselect or exchange
    Bus(B),
}

/// Errors from [`IoTransport`](crate::transport::IoTransport)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError<E> {
    /// The peer closed the link (end of stream)
    Closed,
    /// Underlying I/O error
    Io(E),
}

/// Errors from [`HalBus`](crate::bus::HalBus)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalBusError<S, P> {
    /// SPI peripheral error
    Spi(S),
    /// Chip select pin error
    ChipSelect(P),
}

impl<T: fmt::Debug, B: fmt::Debug> fmt::Display for Error<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {:?}", e),
            Self::Bus(e) => write!(f, "SPI bus error: {:?}", e),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for LinkError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "link closed by peer"),
            Self::Io(e) => write!(f, "link I/O error: {:?}", e),
        }
    }
}

impl<S: fmt::Debug, P: fmt::Debug> fmt::Display for HalBusError<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI transfer failed: {:?}", e),
            Self::ChipSelect(e) => write!(f, "chip select failed: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<T: fmt::Debug, B: fmt::Debug> std::error::Error for Error<T, B> {}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for LinkError<E> {}

#[cfg(feature = "std")]
impl<S: fmt::Debug, P: fmt::Debug> std::error::Error for HalBusError<S, P> {}

/// Result type alias using the dispatcher error type
pub type Result<R, T, B> = core::result::Result<R, Error<T, B>>;
