use coins_bip39::{English, Mnemonic, Wordlist};
use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::{
    Error, Result,
    constants::{CLA_GP, ins},
};

/// GENERATE MNEMONIC: let the card pick BIP39 word indexes
///
/// The card does not store the result; load it with LOAD KEY afterwards.
#[derive(Debug, Clone, Copy)]
pub struct GenerateMnemonicCommand {
    checksum_size: u8,
}

impl GenerateMnemonicCommand {
    /// Ask for 12, 15, 18, 21 or 24 words
    pub const fn with_words(words: u8) -> Result<Self> {
        match words {
            12 | 15 | 18 | 21 | 24 => Ok(Self {
                checksum_size: words / 3,
            }),
            _ => Err(Error::InvalidMnemonicLength(words)),
        }
    }
}

impl ApduCommand for GenerateMnemonicCommand {
    type Success = Mnemonic<English>;
    type Error = Error;

    fn name(&self) -> &'static str {
        "GENERATE MNEMONIC"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::GENERATE_MNEMONIC, self.checksum_size, 0x00).with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<Mnemonic<English>> {
        let data = response.check(self.name())?;
        if data.len() != usize::from(self.checksum_size) * 3 * 2 {
            return Err(Error::InvalidData("unexpected number of mnemonic words"));
        }

        let words = data
            .chunks_exact(2)
            .map(|chunk| English::get(usize::from(u16::from_be_bytes([chunk[0], chunk[1]]))))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Mnemonic::new_from_phrase(&words.join(" "))?)
    }
}
