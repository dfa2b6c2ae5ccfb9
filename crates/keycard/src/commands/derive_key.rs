use nexum_keycard_apdu::{ApduCommand, Command, Response, status};

use crate::{
    Error, Result,
    constants::{CLA_GP, ins},
    path::KeyPath,
};

/// DERIVE KEY: make the key at `path` the current key
#[derive(Debug, Clone)]
pub struct DeriveKeyCommand {
    path: KeyPath,
}

impl DeriveKeyCommand {
    /// Derive along `path` and make the result the current key
    pub const fn new(path: KeyPath) -> Self {
        Self { path }
    }
}

impl ApduCommand for DeriveKeyCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "DERIVE KEY"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::DERIVE_KEY, self.path.source().p1(), 0x00).with_data(self.path.to_bytes())
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        if response.status() == status::SW_WRONG_DATA {
            return Err(Error::InvalidDerivationPath(format!(
                "card rejected {}",
                self.path
            )));
        }
        response.check(self.name())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_derive_key_encoding() {
        let cmd = DeriveKeyCommand::new("m/44'/60'/0'/0/0".parse().unwrap()).command();
        assert_eq!(
            cmd.to_bytes().as_ref(),
            hex!("80D10000148000002C8000003C800000000000000000000000")
        );

        let cmd = DeriveKeyCommand::new("../1".parse().unwrap()).command();
        assert_eq!(cmd.p1, 0x40);
        let cmd = DeriveKeyCommand::new("./1".parse().unwrap()).command();
        assert_eq!(cmd.p1, 0x80);
    }
}
