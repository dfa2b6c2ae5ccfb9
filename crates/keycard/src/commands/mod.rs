//! Keycard applet command builders
//!
//! Each command implements [`ApduCommand`](nexum_keycard_apdu::ApduCommand)
//! with [`crate::Error`] as its error type and maps the status words it knows
//! about to typed errors.

mod derive_key;
mod export_key;
mod factory_reset;
mod generate_key;
mod generate_mnemonic;
mod get_status;
mod init;
mod load_key;
mod mutually_authenticate;
mod open_secure_channel;
mod pair;
mod pin;
mod remove_key;
mod select;
mod set_pinless_path;
mod sign;
mod unpair;

pub use derive_key::DeriveKeyCommand;
pub use export_key::{ExportKeyCommand, ExportOption};
pub use factory_reset::FactoryResetCommand;
pub use generate_key::GenerateKeyCommand;
pub use generate_mnemonic::GenerateMnemonicCommand;
pub use get_status::{GetKeyPathCommand, GetStatusCommand};
pub use init::InitCommand;
pub use load_key::LoadKeyCommand;
pub use mutually_authenticate::MutuallyAuthenticateCommand;
pub use open_secure_channel::{OpenSecureChannelCommand, OpenSecureChannelResponse};
pub use pair::{PairChallenge, PairFinalStepCommand, PairFirstStepCommand};
pub use pin::{ChangeCredentialCommand, Credential, UnblockPinCommand, VerifyPinCommand};
pub use remove_key::RemoveKeyCommand;
pub use select::SelectCommand;
pub use set_pinless_path::SetPinlessPathCommand;
pub use sign::{DeriveMode, SignCommand};
pub use unpair::UnpairCommand;

use nexum_keycard_apdu::Response;

use crate::{Error, Result};

/// Key UID returned by key generation and loading
pub type KeyUid = [u8; 32];

/// Check for success, turning `63Cx` into [`Error::WrongPin`] / [`Error::PinBlocked`]
pub(crate) fn check_pin_response(response: Response, operation: &'static str) -> Result<()> {
    match response.status().retries_left() {
        Some(0) => Err(Error::PinBlocked),
        Some(retries) => Err(Error::WrongPin { retries }),
        None => {
            response.check(operation)?;
            Ok(())
        }
    }
}

/// Parse a 32-byte key UID
pub(crate) fn parse_key_uid(response: Response, operation: &'static str) -> Result<KeyUid> {
    let data = response.check(operation)?;
    KeyUid::try_from(data.as_ref()).map_err(|_| Error::InvalidData("key UID must be 32 bytes"))
}
