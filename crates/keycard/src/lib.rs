//! Host side of the Keycard applet protocol
//!
//! Pairing, the ECDH-based secure channel, the applet command set and the
//! installer that provisions the applet through the card manager. The
//! entry point is [`Keycard`].

pub mod application;
pub mod cash;
pub mod commands;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod installer;
pub mod pairing;
pub mod path;
pub mod secrets;
pub mod secure_channel;
pub mod session;
pub mod types;

pub use application::{CardState, Keycard};
pub use cash::CashCommandSet;
pub use commands::{DeriveMode, ExportOption, KeyUid};
pub use constants::{KEYCARD_AID, PACKAGE_AID};
pub use error::{Error, Result};
pub use installer::Installer;
pub use path::{KeyPath, PathSource};
pub use secrets::{Secrets, SecretsConfig};
pub use secure_channel::KeycardSecureChannel;
pub use session::Session;
pub use types::*;
