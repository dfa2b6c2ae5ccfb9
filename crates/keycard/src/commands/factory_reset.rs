use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::{
    Error, Result,
    constants::{CLA_GP, factory_reset, ins},
};

/// FACTORY RESET: wipe keys, credentials and pairings
///
/// Sent without a secure channel; the fixed P1/P2 act as confirmation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactoryResetCommand;

impl ApduCommand for FactoryResetCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "FACTORY RESET"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::FACTORY_RESET, factory_reset::P1, factory_reset::P2)
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        response.check(self.name())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_factory_reset() {
        assert_eq!(FactoryResetCommand.command().to_bytes().as_ref(), hex!("80FDAA55"));
    }
}
