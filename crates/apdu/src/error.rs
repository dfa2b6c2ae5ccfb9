use crate::{StatusWord, TransportError};

/// Result type for APDU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the codec and channel layer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport failed; the session must be considered lost
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response shorter than the mandatory status word
    #[error("Malformed response: expected at least 2 bytes, got {len}")]
    MalformedResponse {
        /// Number of bytes received
        len: usize,
    },

    /// Command could not be encoded or decoded
    #[error("Invalid command: {0}")]
    InvalidCommand(&'static str),

    /// A command completed with a status word the caller did not accept
    #[error("Unexpected response to {operation}: {status}")]
    UnexpectedResponse {
        /// Name of the originating operation
        operation: &'static str,
        /// Status word returned by the card
        status: StatusWord,
    },

    /// A secure channel could not protect or verify a message
    #[error(transparent)]
    SecureChannel(#[from] SecureChannelError),
}

/// Failures of a secure channel decorator
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SecureChannelError {
    /// The response MAC did not match
    #[error("Invalid response MAC")]
    InvalidMac,

    /// Decrypted data was not correctly padded
    #[error("Invalid padding")]
    InvalidPadding,

    /// Protected data had an impossible length
    #[error("Invalid protected data length: {0}")]
    InvalidLength(usize),
}

impl Error {
    /// Status word carried by this error, if any
    pub const fn status(&self) -> Option<StatusWord> {
        match self {
            Self::UnexpectedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}
