//! Keycard secure channel
//!
//! [`KeycardSecureChannel`] decorates another [`Channel`]: every command is
//! encrypted and MAC-ed with the session keys and every successful response
//! is verified and decrypted before it reaches the caller.

use k256::PublicKey;
use nexum_keycard_apdu::{Channel, Command, RandomSource, Response};
use tracing::{debug, warn};

use crate::{
    Error, Result,
    commands::MutuallyAuthenticateCommand,
    crypto::Challenge,
    session::Session,
    types::PairingInfo,
};

/// Channel to the Keycard applet protected by the session keys
#[derive(Debug)]
pub struct KeycardSecureChannel<C: Channel> {
    inner: C,
    session: Session,
}

impl<C: Channel> KeycardSecureChannel<C> {
    /// Decorate `inner` with an already opened session
    ///
    /// Nothing but MUTUALLY AUTHENTICATE should be sent before
    /// [`authenticate`](Self::authenticate) succeeds.
    pub const fn new(inner: C, session: Session) -> Self {
        Self { inner, session }
    }

    /// Run the full handshake: OPEN SECURE CHANNEL, then MUTUALLY AUTHENTICATE
    pub fn open(
        mut inner: C,
        card_public_key: &PublicKey,
        pairing: &PairingInfo,
        rng: &mut dyn RandomSource,
    ) -> Result<Self> {
        let session = Session::open(&mut inner, card_public_key, pairing, rng)?;
        let mut channel = Self::new(inner, session);
        channel.authenticate(rng)?;
        Ok(channel)
    }

    /// Exchange fresh challenges to prove both ends hold the same keys
    pub fn authenticate(&mut self, rng: &mut dyn RandomSource) -> Result<()> {
        let mut challenge = Challenge::default();
        rng.fill_bytes(&mut challenge);

        match self.execute(&MutuallyAuthenticateCommand::new(challenge)) {
            Ok(_) => {
                debug!("keycard secure channel established");
                Ok(())
            }
            Err(e @ Error::Apdu(nexum_keycard_apdu::Error::Transport(_))) => Err(e),
            Err(Error::InvalidResponseMac | Error::Apdu(_)) => {
                warn!("mutual authentication response failed verification");
                Err(Error::SecureChannelOpenFailed("mutual authentication failed"))
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the session and give back the wrapped channel
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Channel> Channel for KeycardSecureChannel<C> {
    fn send(&mut self, command: &Command) -> nexum_keycard_apdu::Result<Response> {
        let wrapped = self.session.wrap_command(command)?;
        let response = self.inner.send(&wrapped)?;
        self.session.unwrap_response(response)
    }
}
