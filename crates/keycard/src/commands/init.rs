use cipher::Iv;
use k256::PublicKey;
use nexum_keycard_apdu::{ApduCommand, Command, RandomSource, Response, status};
use zeroize::Zeroizing;

use crate::{
    Error, Result,
    constants::{CLA_GP, ins},
    crypto::{KeycardScp, ecdh_shared_secret, ephemeral_key, generate_pairing_token, one_shot_encrypt},
    secrets::Secrets,
};

/// INIT: store PIN, PUK and pairing token on a fresh applet
///
/// The secrets travel encrypted under an ECDH secret with the card's
/// secure channel key, since no pairing exists yet.
#[derive(Clone)]
pub struct InitCommand {
    data: Zeroizing<Vec<u8>>,
}

impl InitCommand {
    /// Encrypt `secrets` for the card owning `card_public_key`
    pub fn new(card_public_key: &PublicKey, secrets: &Secrets, rng: &mut dyn RandomSource) -> Self {
        let host = ephemeral_key(rng);
        let shared = ecdh_shared_secret(&host, card_public_key);
        let iv = Iv::<KeycardScp>::clone_from_slice(&rng.random_bytes(16));

        let token = Zeroizing::new(generate_pairing_token(secrets.pairing_password()));
        let mut plain = Zeroizing::new(Vec::with_capacity(6 + 12 + 32));
        plain.extend_from_slice(secrets.pin().as_bytes());
        plain.extend_from_slice(secrets.puk().as_bytes());
        plain.extend_from_slice(&*token);

        Self {
            data: Zeroizing::new(one_shot_encrypt(&host.public_key(), &shared, &iv, &plain)),
        }
    }
}

impl std::fmt::Debug for InitCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitCommand").finish_non_exhaustive()
    }
}

impl ApduCommand for InitCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "INIT"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::INIT, 0x00, 0x00).with_data(self.data.to_vec())
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        // initialized applets no longer know INIT
        if response.status() == status::SW_INS_NOT_SUPPORTED {
            return Err(Error::AlreadyInitialized);
        }
        response.check(self.name())?;
        Ok(())
    }
}
