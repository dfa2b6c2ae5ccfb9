use nexum_keycard_apdu::{ApduCommand, Command, Response};

use super::{KeyUid, parse_key_uid};
use crate::{
    Error, Result,
    constants::{CLA_GP, ins},
};

/// GENERATE KEY: create a new master key on the card
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateKeyCommand;

impl ApduCommand for GenerateKeyCommand {
    type Success = KeyUid;
    type Error = Error;

    fn name(&self) -> &'static str {
        "GENERATE KEY"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::GENERATE_KEY, 0x00, 0x00).with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<KeyUid> {
        parse_key_uid(response, self.name())
    }
}
