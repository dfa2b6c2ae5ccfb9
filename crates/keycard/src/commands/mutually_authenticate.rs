use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::{
    Error, Result,
    constants::{CLA_GP, ins},
    crypto::Challenge,
};

/// MUTUALLY AUTHENTICATE: first command over a fresh secure channel
///
/// The card answers with its own 32-byte challenge; any other answer means
/// the two ends derived different session keys.
#[derive(Debug, Clone)]
pub struct MutuallyAuthenticateCommand {
    challenge: Challenge,
}

impl MutuallyAuthenticateCommand {
    /// Authenticate with a random 32 byte challenge
    pub const fn new(challenge: Challenge) -> Self {
        Self { challenge }
    }
}

impl ApduCommand for MutuallyAuthenticateCommand {
    type Success = Challenge;
    type Error = Error;

    fn name(&self) -> &'static str {
        "MUTUALLY AUTHENTICATE"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::MUTUALLY_AUTHENTICATE, 0x00, 0x00).with_data(self.challenge.to_vec())
    }

    fn parse_response(&self, response: Response) -> Result<Challenge> {
        if !response.is_success() {
            return Err(Error::SecureChannelOpenFailed("mutual authentication rejected"));
        }
        Challenge::try_from(response.data())
            .map_err(|_| Error::SecureChannelOpenFailed("mutual authentication response must be 32 bytes"))
    }
}
