use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::{
    Error, Result,
    constants::{CLA_GP, get_status_p1, ins},
    path::KeyPath,
    types::ApplicationStatus,
};

/// GET STATUS for the application: retry counters and key presence
#[derive(Debug, Clone, Copy, Default)]
pub struct GetStatusCommand;

impl ApduCommand for GetStatusCommand {
    type Success = ApplicationStatus;
    type Error = Error;

    fn name(&self) -> &'static str {
        "GET STATUS"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::GET_STATUS, get_status_p1::APPLICATION, 0x00).with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<ApplicationStatus> {
        let data = response.check(self.name())?;
        ApplicationStatus::try_from(data.as_ref())
    }
}

/// GET STATUS for the key path: the absolute path of the current key
#[derive(Debug, Clone, Copy, Default)]
pub struct GetKeyPathCommand;

impl ApduCommand for GetKeyPathCommand {
    type Success = KeyPath;
    type Error = Error;

    fn name(&self) -> &'static str {
        "GET STATUS"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::GET_STATUS, get_status_p1::KEY_PATH, 0x00).with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<KeyPath> {
        let data = response.check(self.name())?;
        KeyPath::from_bytes(&data)
    }
}
