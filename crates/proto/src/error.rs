//! Error types for packet encoding and decoding

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, ProtoError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    #[error("Unknown packet id: 0x{0:02x}")]
    UnknownPacket(u8),

    #[error("Buffer underflow: expected {expected} bytes, got {actual}")]
    BufferUnderflow { expected: usize, actual: usize },

    #[error("Invalid value {value} for field '{field}'")]
    InvalidField { field: &'static str, value: u8 },
}
