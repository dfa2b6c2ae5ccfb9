use nexum_keycard_apdu::{ApduCommand, Command, Response, status};

use crate::{
    Error, Result,
    constants::{CLA_GP, ins, pair_p1},
    crypto::{Challenge, Cryptogram},
};

/// Card answer to the first PAIR step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairChallenge {
    /// `SHA256(token ‖ client challenge)` as computed by the card
    pub cryptogram: Cryptogram,
    /// Challenge the host must answer
    pub challenge: Challenge,
}

/// PAIR, first step: send the client challenge
#[derive(Debug, Clone)]
pub struct PairFirstStepCommand {
    challenge: Challenge,
}

impl PairFirstStepCommand {
    /// Start pairing with a random 32 byte client challenge
    pub const fn new(challenge: Challenge) -> Self {
        Self { challenge }
    }
}

impl ApduCommand for PairFirstStepCommand {
    type Success = PairChallenge;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PAIR"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::PAIR, pair_p1::FIRST_STEP, 0x00).with_data(self.challenge.to_vec())
    }

    fn parse_response(&self, response: Response) -> Result<PairChallenge> {
        if response.status() == status::SW_FILE_FULL {
            return Err(Error::NoAvailablePairingSlots);
        }
        let data = response.check(self.name())?;
        if data.len() != 64 {
            return Err(Error::InvalidData("PAIR response must be 64 bytes"));
        }

        let mut cryptogram = Cryptogram::default();
        cryptogram.copy_from_slice(&data[..32]);
        let mut challenge = Challenge::default();
        challenge.copy_from_slice(&data[32..]);
        Ok(PairChallenge {
            cryptogram,
            challenge,
        })
    }
}

/// PAIR, final step: prove knowledge of the token
///
/// Yields the pairing slot index and the salt the pairing key is derived
/// from.
#[derive(Debug, Clone)]
pub struct PairFinalStepCommand {
    cryptogram: Cryptogram,
}

impl PairFinalStepCommand {
    /// Answer the card challenge with `SHA256(token ‖ card challenge)`
    pub const fn new(cryptogram: Cryptogram) -> Self {
        Self { cryptogram }
    }
}

impl ApduCommand for PairFinalStepCommand {
    type Success = (u8, [u8; 32]);
    type Error = Error;

    fn name(&self) -> &'static str {
        "PAIR"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::PAIR, pair_p1::FINAL_STEP, 0x00).with_data(self.cryptogram.to_vec())
    }

    fn parse_response(&self, response: Response) -> Result<(u8, [u8; 32])> {
        match response.status() {
            status::SW_FILE_FULL => return Err(Error::NoAvailablePairingSlots),
            status::SW_SECURITY_STATUS_NOT_SATISFIED => return Err(Error::PairingPasswordMismatch),
            _ => {}
        }
        let data = response.check(self.name())?;
        if data.len() != 33 {
            return Err(Error::InvalidData("PAIR final response must be 33 bytes"));
        }

        let mut salt = [0u8; 32];
        salt.copy_from_slice(&data[1..]);
        Ok((data[0], salt))
    }
}
