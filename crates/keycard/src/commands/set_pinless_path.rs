use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::{
    Error, Result,
    constants::{CLA_GP, ins},
    path::KeyPath,
};

/// SET PINLESS PATH: register the one key that may sign without a PIN
#[derive(Debug, Clone)]
pub struct SetPinlessPathCommand {
    path: Option<KeyPath>,
}

impl SetPinlessPathCommand {
    /// Register `path`, which must start at the master key
    pub fn new(path: KeyPath) -> Result<Self> {
        if !path.is_absolute() {
            return Err(Error::InvalidDerivationPath(format!(
                "pinless path must be absolute, got {path}"
            )));
        }
        Ok(Self { path: Some(path) })
    }

    /// Unregister the pinless path
    pub const fn clear() -> Self {
        Self { path: None }
    }
}

impl ApduCommand for SetPinlessPathCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "SET PINLESS PATH"
    }

    fn command(&self) -> Command {
        let command = Command::new(CLA_GP, ins::SET_PINLESS_PATH, 0x00, 0x00);
        match &self.path {
            Some(path) => command.with_data(path.to_bytes()),
            None => command,
        }
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        response.check(self.name())?;
        Ok(())
    }
}
