//! APDU primitives for talking to a Keycard
//!
//! This crate provides the ISO/IEC 7816-4 command/response codec, the raw
//! [`CardTransport`] collaborator, and the [`Channel`] abstraction that the
//! card-manager and applet secure channels decorate.

pub mod channel;
pub mod command;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod random;
pub mod response;
pub mod status;
pub mod transport;

pub use bytes::Bytes;
pub use channel::{ApduCommand, Channel, PlainChannel};
pub use command::Command;
pub use error::{Error, Result, SecureChannelError};
pub use random::{RandomSource, SystemRandom};
pub use response::Response;
pub use status::StatusWord;
pub use transport::{CardTransport, TransportError};

/// Commonly used items
pub mod prelude {
    pub use crate::{
        ApduCommand, Bytes, CardTransport, Channel, Command, PlainChannel, RandomSource, Response,
        StatusWord, SystemRandom, TransportError, status,
    };
}
