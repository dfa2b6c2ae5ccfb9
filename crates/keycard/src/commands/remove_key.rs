use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::{
    Error, Result,
    constants::{CLA_GP, ins},
};

/// REMOVE KEY: wipe the master key
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveKeyCommand;

impl ApduCommand for RemoveKeyCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "REMOVE KEY"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::REMOVE_KEY, 0x00, 0x00)
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        response.check(self.name())?;
        Ok(())
    }
}
