use std::fmt;

use nexum_keycard_apdu::{ApduCommand, Command, Response, status};
use zeroize::Zeroizing;

use super::check_pin_response;
use crate::{
    Error, Result,
    constants::{CLA_GP, change_p1, ins},
    crypto::generate_pairing_token,
    secrets::{validate_pin, validate_puk},
};

/// VERIFY PIN
///
/// `63Cx` is reported as [`Error::WrongPin`] with `x` attempts left, or
/// [`Error::PinBlocked`] when none remain.
#[derive(Clone)]
pub struct VerifyPinCommand {
    pin: Zeroizing<Vec<u8>>,
}

impl VerifyPinCommand {
    /// Verify `pin`; fails with [`Error::InvalidPin`] before anything is sent
    pub fn new(pin: &str) -> Result<Self> {
        validate_pin(pin)?;
        Ok(Self {
            pin: Zeroizing::new(pin.as_bytes().to_vec()),
        })
    }
}

impl fmt::Debug for VerifyPinCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyPinCommand").finish_non_exhaustive()
    }
}

impl ApduCommand for VerifyPinCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "VERIFY PIN"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::VERIFY_PIN, 0x00, 0x00).with_data(self.pin.to_vec())
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        check_pin_response(response, self.name())
    }
}

/// Credential replaced by CHANGE PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Pin,
    Puk,
    PairingSecret,
}

impl Credential {
    const fn p1(self) -> u8 {
        match self {
            Self::Pin => change_p1::PIN,
            Self::Puk => change_p1::PUK,
            Self::PairingSecret => change_p1::PAIRING_SECRET,
        }
    }
}

/// CHANGE PIN for the PIN, the PUK or the pairing secret
#[derive(Clone)]
pub struct ChangeCredentialCommand {
    credential: Credential,
    data: Zeroizing<Vec<u8>>,
}

impl ChangeCredentialCommand {
    /// New six digit PIN
    pub fn pin(pin: &str) -> Result<Self> {
        validate_pin(pin)?;
        Ok(Self {
            credential: Credential::Pin,
            data: Zeroizing::new(pin.as_bytes().to_vec()),
        })
    }

    /// New twelve digit PUK
    pub fn puk(puk: &str) -> Result<Self> {
        validate_puk(puk)?;
        Ok(Self {
            credential: Credential::Puk,
            data: Zeroizing::new(puk.as_bytes().to_vec()),
        })
    }

    /// New pairing password; the card stores its derived token
    pub fn pairing_secret(password: &str) -> Self {
        Self {
            credential: Credential::PairingSecret,
            data: Zeroizing::new(generate_pairing_token(password).to_vec()),
        }
    }

    /// Which credential is being replaced
    pub const fn credential(&self) -> Credential {
        self.credential
    }
}

impl fmt::Debug for ChangeCredentialCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeCredentialCommand")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl ApduCommand for ChangeCredentialCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "CHANGE PIN"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::CHANGE_PIN, self.credential.p1(), 0x00).with_data(self.data.to_vec())
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        if response.status() == status::SW_CONDITIONS_NOT_SATISFIED {
            return Err(Error::PinVerificationRequired);
        }
        check_pin_response(response, self.name())
    }
}

/// UNBLOCK PIN: reset the PIN with the PUK
///
/// `63Cx` here counts PUK attempts and is reported as [`Error::WrongPuk`].
#[derive(Clone)]
pub struct UnblockPinCommand {
    data: Zeroizing<Vec<u8>>,
}

impl UnblockPinCommand {
    /// Unblock with `puk` and set `new_pin`, both checked locally first
    pub fn new(puk: &str, new_pin: &str) -> Result<Self> {
        validate_puk(puk)?;
        validate_pin(new_pin)?;

        let mut data = Zeroizing::new(Vec::with_capacity(puk.len() + new_pin.len()));
        data.extend_from_slice(puk.as_bytes());
        data.extend_from_slice(new_pin.as_bytes());
        Ok(Self { data })
    }
}

impl fmt::Debug for UnblockPinCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnblockPinCommand").finish_non_exhaustive()
    }
}

impl ApduCommand for UnblockPinCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "UNBLOCK PIN"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::UNBLOCK_PIN, 0x00, 0x00).with_data(self.data.to_vec())
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        if let Some(retries) = response.status().retries_left() {
            return Err(Error::WrongPuk { retries });
        }
        response.check(self.name())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use nexum_keycard_apdu::StatusWord;

    #[test]
    fn test_verify_pin() {
        let cmd = VerifyPinCommand::new("123456").unwrap();
        assert_eq!(cmd.command().to_bytes().as_ref(), hex!("8020000006313233343536"));
        assert!(matches!(VerifyPinCommand::new("1234"), Err(Error::InvalidPin)));

        assert!(matches!(
            cmd.parse_response(Response::status_only(StatusWord::new(0x63, 0xC2))),
            Err(Error::WrongPin { retries: 2 })
        ));
        assert!(matches!(
            cmd.parse_response(Response::status_only(StatusWord::new(0x63, 0xC0))),
            Err(Error::PinBlocked)
        ));
        assert!(cmd.parse_response(Response::status_only(status::SW_NO_ERROR)).is_ok());
    }

    #[test]
    fn test_change_credentials() {
        let cmd = ChangeCredentialCommand::pin("654321").unwrap().command();
        assert_eq!((cmd.ins, cmd.p1), (0x21, 0x00));
        assert_eq!(cmd.data(), b"654321");

        let cmd = ChangeCredentialCommand::puk("210987654321").unwrap().command();
        assert_eq!(cmd.p1, 0x01);
        assert!(ChangeCredentialCommand::puk("1").is_err());

        let cmd = ChangeCredentialCommand::pairing_secret("new pass").command();
        assert_eq!(cmd.p1, 0x02);
        assert_eq!(cmd.data(), generate_pairing_token("new pass"));
    }

    #[test]
    fn test_unblock_pin() {
        let cmd = UnblockPinCommand::new("123456789012", "000000").unwrap();
        let apdu = cmd.command();
        assert_eq!(apdu.ins, 0x22);
        assert_eq!(apdu.data(), b"123456789012000000");

        assert!(matches!(
            cmd.parse_response(Response::status_only(StatusWord::new(0x63, 0xC4))),
            Err(Error::WrongPuk { retries: 4 })
        ));
    }
}
