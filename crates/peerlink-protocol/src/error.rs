//! Error types for the protocol layer.
//!
//! Each crate in Peerlink defines its own error enum. A `ProtocolError`
//! always means the bytes were wrong, never that the network was.

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame ended before a field could be read.
    #[error("truncated frame: needed {needed} more bytes at offset {offset}, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// The frame had bytes left over after the last field of its kind.
    ///
    /// Rejecting these keeps the encoding canonical: a decoded message
    /// re-encodes to exactly the bytes it came from.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// A length-prefixed peer id was not valid UTF-8.
    #[error("peer id is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A control byte had bits set outside the low nibble.
    #[error("invalid control byte {0:#04x}")]
    InvalidControlBits(u8),

    /// The message can't be represented on the wire, e.g. a non-numeric
    /// peer id under the `u64` id encoding.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
