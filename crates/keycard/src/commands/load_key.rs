use nexum_keycard_apdu::{ApduCommand, Command, Response};
use zeroize::Zeroizing;

use super::{KeyUid, parse_key_uid};
use crate::{
    Error, Result,
    constants::{CLA_GP, ins, load_key_p1},
};

/// BIP39 seed length
pub const SEED_LENGTH: usize = 64;

/// LOAD KEY with a BIP39 seed
#[derive(Clone)]
pub struct LoadKeyCommand {
    seed: Zeroizing<Vec<u8>>,
}

impl LoadKeyCommand {
    /// Load a 64-byte BIP39 seed
    pub fn seed(seed: &[u8]) -> Result<Self> {
        if seed.len() != SEED_LENGTH {
            return Err(Error::InvalidSeedLength(seed.len()));
        }
        Ok(Self {
            seed: Zeroizing::new(seed.to_vec()),
        })
    }
}

impl std::fmt::Debug for LoadKeyCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadKeyCommand").finish_non_exhaustive()
    }
}

impl ApduCommand for LoadKeyCommand {
    type Success = KeyUid;
    type Error = Error;

    fn name(&self) -> &'static str {
        "LOAD KEY"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::LOAD_KEY, load_key_p1::BIP39_SEED, 0x00)
            .with_data(self.seed.to_vec())
            .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<KeyUid> {
        parse_key_uid(response, self.name())
    }
}
