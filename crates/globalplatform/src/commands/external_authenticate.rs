use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::constants::{cla, external_auth_p1, ins};
use crate::crypto::Cryptogram;
use crate::{Error, Result};

/// EXTERNAL AUTHENTICATE with the host cryptogram, requesting C-MAC
#[derive(Debug, Clone)]
pub struct ExternalAuthenticateCommand {
    host_cryptogram: Cryptogram,
}

impl ExternalAuthenticateCommand {
    /// Authenticate with `host_cryptogram`
    pub const fn new(host_cryptogram: Cryptogram) -> Self {
        Self { host_cryptogram }
    }
}

impl ApduCommand for ExternalAuthenticateCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "EXTERNAL AUTHENTICATE"
    }

    fn command(&self) -> Command {
        Command::new(cla::GP, ins::EXTERNAL_AUTHENTICATE, external_auth_p1::CMAC, 0x00)
            .with_data(self.host_cryptogram.to_vec())
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        response.check(self.name())?;
        Ok(())
    }
}
