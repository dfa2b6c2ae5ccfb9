use k256::{PublicKey, elliptic_curve::sec1::ToEncodedPoint};
use nexum_keycard_apdu::{ApduCommand, Command, Response, status};

use crate::{
    Error, Result,
    constants::{CLA_GP, ins},
    crypto::Challenge,
};

/// Salt and first IV chosen by the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSecureChannelResponse {
    pub salt: Challenge,
    pub iv: [u8; 16],
}

/// OPEN SECURE CHANNEL with the host ephemeral key
#[derive(Debug, Clone)]
pub struct OpenSecureChannelCommand {
    pairing_index: u8,
    public_key: Vec<u8>,
}

impl OpenSecureChannelCommand {
    /// Open on slot `pairing_index` with the host ephemeral key
    pub fn new(pairing_index: u8, host_public_key: &PublicKey) -> Self {
        Self {
            pairing_index,
            public_key: host_public_key.to_encoded_point(false).as_bytes().to_vec(),
        }
    }
}

impl ApduCommand for OpenSecureChannelCommand {
    type Success = OpenSecureChannelResponse;
    type Error = Error;

    fn name(&self) -> &'static str {
        "OPEN SECURE CHANNEL"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::OPEN_SECURE_CHANNEL, self.pairing_index, 0x00)
            .with_data(self.public_key.clone())
    }

    fn parse_response(&self, response: Response) -> Result<OpenSecureChannelResponse> {
        if response.status() == status::SW_INCORRECT_P1P2 {
            return Err(Error::SecureChannelOpenFailed("pairing slot is empty"));
        }
        let data = response.check(self.name())?;
        if data.len() != 48 {
            return Err(Error::SecureChannelOpenFailed(
                "OPEN SECURE CHANNEL response must be 48 bytes",
            ));
        }

        let mut salt = Challenge::default();
        salt.copy_from_slice(&data[..32]);
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&data[32..]);
        Ok(OpenSecureChannelResponse { salt, iv })
    }
}
