use nexum_keycard_apdu::{ApduCommand, Command, Response};

use super::DeriveMode;
use crate::{
    Error, Result,
    constants::{CLA_GP, derive_p1, export_p2, ins},
    path::KeyPath,
    types::Keypair,
};

/// What EXPORT KEY returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportOption {
    /// Private and public key
    PrivateAndPublic,
    /// Public key only
    #[default]
    PublicOnly,
}

impl ExportOption {
    const fn p2(self) -> u8 {
        match self {
            Self::PrivateAndPublic => export_p2::PRIVATE_AND_PUBLIC,
            Self::PublicOnly => export_p2::PUBLIC_ONLY,
        }
    }
}

/// EXPORT KEY from the current key or a derived one
#[derive(Debug, Clone)]
pub struct ExportKeyCommand {
    p1: u8,
    option: ExportOption,
    path: Option<KeyPath>,
}

impl ExportKeyCommand {
    /// Export the current key
    pub const fn current(option: ExportOption) -> Self {
        Self {
            p1: derive_p1::CURRENT_KEY,
            option,
            path: None,
        }
    }

    /// Export the key at `path`
    pub fn with_path(path: KeyPath, mode: DeriveMode, option: ExportOption) -> Self {
        Self {
            p1: mode.p1() | path.source().p1(),
            option,
            path: Some(path),
        }
    }
}

impl ApduCommand for ExportKeyCommand {
    type Success = Keypair;
    type Error = Error;

    fn name(&self) -> &'static str {
        "EXPORT KEY"
    }

    fn command(&self) -> Command {
        let command = Command::new(CLA_GP, ins::EXPORT_KEY, self.p1, self.option.p2());
        match &self.path {
            Some(path) => command.with_data(path.to_bytes()),
            None => command,
        }
        .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<Keypair> {
        let data = response.check(self.name())?;
        Keypair::try_from(data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_export_key_encoding() {
        let cmd = ExportKeyCommand::current(ExportOption::PublicOnly).command();
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80C2000100"));

        let path: KeyPath = "m/44'/60'/0'/0/0".parse().unwrap();
        let cmd = ExportKeyCommand::with_path(path, DeriveMode::Persistent, ExportOption::PrivateAndPublic)
            .command();
        assert_eq!((cmd.p1, cmd.p2), (0x02, 0x00));
        assert_eq!(cmd.data().len(), 20);
    }
}
