//! Error types for host-side operations

use thiserror::Error;

/// Errors raised by host links and the serprog client
#[derive(Debug, Error)]
pub enum HostError {
    /// Failed to connect to or listen for a peer
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to synchronize protocol
    #[error("Protocol synchronization failed")]
    SyncFailed,

    /// Unsupported protocol version
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u16),

    /// Command not supported by programmer
    #[error("Command 0x{0:02X} not supported")]
    CommandNotSupported(u8),

    /// SPI bus not supported by programmer
    #[error("SPI bus not supported by programmer")]
    SpiNotSupported,

    /// NAK response received
    #[error("NAK received for command 0x{0:02X}")]
    Nak(u8),

    /// Invalid response received
    #[error("Invalid response 0x{response:02X} for command 0x{command:02X}")]
    InvalidResponse {
        /// Opcode that was sent
        command: u8,
        /// First byte that came back
        response: u8,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Result type for host-side operations
pub type Result<T> = std::result::Result<T, HostError>;
