use bytes::Bytes;
use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::constants::{cla, ins};
use crate::crypto::HostChallenge;
use crate::{Error, Result};

/// INITIALIZE UPDATE carrying the host challenge
#[derive(Debug, Clone)]
pub struct InitializeUpdateCommand {
    host_challenge: HostChallenge,
}

impl InitializeUpdateCommand {
    /// Start a handshake with `host_challenge`
    pub const fn new(host_challenge: HostChallenge) -> Self {
        Self { host_challenge }
    }
}

impl ApduCommand for InitializeUpdateCommand {
    type Success = Bytes;
    type Error = Error;

    fn name(&self) -> &'static str {
        "INITIALIZE UPDATE"
    }

    fn command(&self) -> Command {
        Command::new(cla::GP, ins::INITIALIZE_UPDATE, 0x00, 0x00)
            .with_data(self.host_challenge.to_vec())
            .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<Bytes> {
        Ok(response.check(self.name())?)
    }
}
