use bytes::{BufMut, Bytes, BytesMut};
use nexum_keycard_apdu::{ApduCommand, Command, Response, status};

use crate::{
    Error, Result,
    constants::{CLA_GP, derive_p1, ins},
    path::KeyPath,
    types::Signature,
};

/// What happens to the current key when a command carries a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeriveMode {
    /// Use the derived key for this command only
    #[default]
    Temporary,
    /// The derived key becomes the current key
    Persistent,
}

impl DeriveMode {
    pub(crate) const fn p1(self) -> u8 {
        match self {
            Self::Temporary => derive_p1::DERIVE,
            Self::Persistent => derive_p1::DERIVE_AND_MAKE_CURRENT,
        }
    }
}

/// SIGN a 32-byte hash
///
/// P1 combines the derive option with the path source; pinless signing
/// takes neither and uses the path registered with SET PINLESS PATH.
#[derive(Debug, Clone)]
pub struct SignCommand {
    hash: [u8; 32],
    p1: u8,
    path: Option<Bytes>,
}

impl SignCommand {
    /// Sign with the current key
    pub fn current(hash: &[u8]) -> Result<Self> {
        Ok(Self {
            hash: check_hash(hash)?,
            p1: derive_p1::CURRENT_KEY,
            path: None,
        })
    }

    /// Sign with the key at `path`
    pub fn with_path(hash: &[u8], path: &KeyPath, mode: DeriveMode) -> Result<Self> {
        Ok(Self {
            hash: check_hash(hash)?,
            p1: mode.p1() | path.source().p1(),
            path: Some(path.to_bytes()),
        })
    }

    /// Sign with the pinless path key, no PIN needed
    pub fn pinless(hash: &[u8]) -> Result<Self> {
        Ok(Self {
            hash: check_hash(hash)?,
            p1: derive_p1::PINLESS,
            path: None,
        })
    }

    const fn is_pinless(&self) -> bool {
        self.p1 == derive_p1::PINLESS
    }
}

fn check_hash(hash: &[u8]) -> Result<[u8; 32]> {
    hash.try_into().map_err(|_| Error::InvalidHashLength(hash.len()))
}

impl ApduCommand for SignCommand {
    type Success = Signature;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SIGN"
    }

    fn command(&self) -> Command {
        let path = self.path.as_deref().unwrap_or_default();
        let mut data = BytesMut::with_capacity(self.hash.len() + path.len());
        data.put_slice(&self.hash);
        data.put_slice(path);

        Command::new(CLA_GP, ins::SIGN, self.p1, 0x00)
            .with_data(data.freeze())
            .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<Signature> {
        match response.status() {
            status::SW_REFERENCED_DATA_NOT_FOUND if self.is_pinless() => {
                return Err(Error::PinlessPathRequired);
            }
            status::SW_CONDITIONS_NOT_SATISFIED => return Err(Error::PinVerificationRequired),
            _ => {}
        }
        let data = response.check(self.name())?;
        Signature::from_response(&self.hash, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_sign_p1() {
        let hash = [0x01; 32];
        assert_eq!(SignCommand::current(&hash).unwrap().command().p1, 0x00);
        assert_eq!(SignCommand::pinless(&hash).unwrap().command().p1, 0x03);

        let path: KeyPath = "m/44'/60'/0'/0/0".parse().unwrap();
        let cmd = SignCommand::with_path(&hash, &path, DeriveMode::Temporary).unwrap().command();
        assert_eq!(cmd.p1, 0x01);
        assert_eq!(cmd.data().len(), 32 + 20);
        assert_eq!(&cmd.data()[32..36], hex!("8000002C"));

        let relative: KeyPath = "../0".parse().unwrap();
        let cmd = SignCommand::with_path(&hash, &relative, DeriveMode::Persistent).unwrap().command();
        assert_eq!(cmd.p1, 0x42);
    }

    #[test]
    fn test_sign_rejects_bad_hash() {
        assert!(matches!(SignCommand::current(&[0u8; 31]), Err(Error::InvalidHashLength(31))));
        assert!(matches!(SignCommand::pinless(&[0u8; 33]), Err(Error::InvalidHashLength(33))));
    }

    #[test]
    fn test_sign_status_mapping() {
        let pinless = SignCommand::pinless(&[0x01; 32]).unwrap();
        assert!(matches!(
            pinless.parse_response(Response::status_only(status::SW_REFERENCED_DATA_NOT_FOUND)),
            Err(Error::PinlessPathRequired)
        ));

        let current = SignCommand::current(&[0x01; 32]).unwrap();
        assert!(matches!(
            current.parse_response(Response::status_only(status::SW_CONDITIONS_NOT_SATISFIED)),
            Err(Error::PinVerificationRequired)
        ));
        assert!(matches!(
            current.parse_response(Response::status_only(status::SW_REFERENCED_DATA_NOT_FOUND)),
            Err(Error::UnexpectedResponse { operation: "SIGN", .. })
        ));
    }
}
