//! GlobalPlatform card manager support for Keycard provisioning
//!
//! This crate implements the subset of GlobalPlatform needed to put the
//! Keycard applet on a card: SCP02 mutual authentication with C-MAC command
//! protection, and the DELETE / INSTALL / LOAD / GET STATUS commands.

pub mod application;
pub mod commands;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod load;
pub mod secure_channel;
pub mod session;

pub use application::GlobalPlatform;
pub use commands::*;
pub use constants::{CARD_MANAGER_AID, DEFAULT_KEY};
pub use error::{Error, Result};
pub use load::LoadFileStream;
pub use secure_channel::{GPSecureChannel, Scp02Wrapper};
pub use session::{Scp02Keys, Session};
