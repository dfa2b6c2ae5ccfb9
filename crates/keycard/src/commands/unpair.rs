use nexum_keycard_apdu::{ApduCommand, Command, Response, status};

use crate::{
    Error, Result,
    constants::{CLA_GP, MAX_PAIRING_SLOTS, ins},
};

/// UNPAIR: free a pairing slot
#[derive(Debug, Clone, Copy)]
pub struct UnpairCommand {
    index: u8,
}

impl UnpairCommand {
    /// Free slot `index`; fails with [`Error::InvalidData`] past the last slot
    pub fn new(index: u8) -> Result<Self> {
        if index >= MAX_PAIRING_SLOTS {
            return Err(Error::InvalidData("pairing index out of range"));
        }
        Ok(Self { index })
    }
}

impl ApduCommand for UnpairCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "UNPAIR"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::UNPAIR, self.index, 0x00)
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        if response.status() == status::SW_SECURITY_STATUS_NOT_SATISFIED {
            return Err(Error::PinVerificationRequired);
        }
        response.check(self.name())?;
        Ok(())
    }
}
