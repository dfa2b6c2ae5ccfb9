//! Keycard secure channel session
//!
//! A [`Session`] holds the AES-256 encryption and MAC keys agreed during
//! OPEN SECURE CHANNEL plus the chaining IV. The IV advances with every
//! wrapped command and every unwrapped response: the MAC of one message is
//! the IV of the next.

use std::fmt;

use bytes::{BufMut, BytesMut};
use cipher::{Iv, Key};
use k256::PublicKey;
use nexum_keycard_apdu::{Channel, Command, RandomSource, Response, SecureChannelError};
use tracing::{debug, trace, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    Result,
    commands::OpenSecureChannelCommand,
    crypto::{
        ApduMeta, KeycardScp, calculate_mac, decrypt_data, derive_session_keys,
        ecdh_shared_secret, encrypt_data, ephemeral_key,
    },
    types::PairingInfo,
};

const MAC_LEN: usize = 16;

/// Largest plaintext that still fits one wrapped command
pub const MAX_PLAINTEXT_LENGTH: usize = 223;

/// Session keys and chaining IV
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Session {
    enc: [u8; 32],
    mac: [u8; 32],
    iv: [u8; 16],
}

impl Session {
    /// Run OPEN SECURE CHANNEL over `channel` and derive the session keys
    ///
    /// A fresh ephemeral key is drawn for every call.
    pub fn open<C: Channel>(
        channel: &mut C,
        card_public_key: &PublicKey,
        pairing: &PairingInfo,
        rng: &mut dyn RandomSource,
    ) -> Result<Self> {
        let host_key = ephemeral_key(rng);
        let response = channel.execute(&OpenSecureChannelCommand::new(
            pairing.index,
            &host_key.public_key(),
        ))?;

        let shared = ecdh_shared_secret(&host_key, card_public_key);
        let (enc, mac) = derive_session_keys(
            &shared,
            Key::<KeycardScp>::from_slice(&pairing.key),
            &response.salt,
        );
        debug!(pairing_index = pairing.index, "session keys derived");

        Ok(Self {
            enc: enc.into(),
            mac: mac.into(),
            iv: response.iv,
        })
    }

    /// Build a session from known keys
    pub fn from_raw(enc: &Key<KeycardScp>, mac: &Key<KeycardScp>, iv: &Iv<KeycardScp>) -> Self {
        Self {
            enc: (*enc).into(),
            mac: (*mac).into(),
            iv: (*iv).into(),
        }
    }

    fn enc_key(&self) -> &Key<KeycardScp> {
        Key::<KeycardScp>::from_slice(&self.enc)
    }

    fn mac_key(&self) -> &Key<KeycardScp> {
        Key::<KeycardScp>::from_slice(&self.mac)
    }

    fn iv(&self) -> &Iv<KeycardScp> {
        Iv::<KeycardScp>::from_slice(&self.iv)
    }

    /// Encrypt and MAC a command
    ///
    /// Data becomes `MAC ‖ AES-CBC(data)`; the MAC is the new IV. Header and
    /// Le are kept. Commands too long to wrap are refused before the IV moves.
    pub fn wrap_command(&mut self, command: &Command) -> nexum_keycard_apdu::Result<Command> {
        if command.data().len() > MAX_PLAINTEXT_LENGTH {
            return Err(nexum_keycard_apdu::Error::InvalidCommand(
                "command data too long for the secure channel",
            ));
        }

        let encrypted = encrypt_data(command.data(), self.enc_key(), self.iv());

        let mut meta = ApduMeta::default();
        meta[..4].copy_from_slice(&[command.cla, command.ins, command.p1, command.p2]);
        meta[4] = (encrypted.len() + MAC_LEN) as u8;

        let mac = calculate_mac(&meta, &encrypted, self.mac_key());
        self.iv = mac.into();

        let mut data = BytesMut::with_capacity(MAC_LEN + encrypted.len());
        data.put_slice(&self.iv);
        data.put_slice(&encrypted);

        trace!(ins = command.ins, len = data.len(), "command wrapped");

        let mut wrapped =
            Command::new(command.cla, command.ins, command.p1, command.p2).with_data(data.freeze());
        wrapped.le = command.le;
        Ok(wrapped)
    }

    /// Check and decrypt a response
    ///
    /// Responses with a status other than `9000` were never protected by the
    /// card and are returned as they are. Otherwise the embedded status word
    /// replaces the outer one.
    pub fn unwrap_response(&mut self, response: Response) -> nexum_keycard_apdu::Result<Response> {
        if !response.is_success() {
            return Ok(response);
        }

        let data = response.data();
        if data.len() <= MAC_LEN || (data.len() - MAC_LEN) % MAC_LEN != 0 {
            warn!(len = data.len(), "malformed secure channel response");
            return Err(SecureChannelError::InvalidLength(data.len()).into());
        }
        let (rmac, rdata) = data.split_at(MAC_LEN);

        let mut meta = ApduMeta::default();
        meta[0] = data.len() as u8;

        let previous = *self.iv();
        let next = calculate_mac(&meta, rdata, self.mac_key());
        self.iv = next.into();

        if rmac != next.as_slice() {
            warn!("secure channel response MAC mismatch");
            return Err(SecureChannelError::InvalidMac.into());
        }

        let plain = decrypt_data(rdata, self.enc_key(), &previous)?;
        trace!(len = plain.len(), "response unwrapped");
        Response::from_bytes(&plain)
    }

    #[cfg(test)]
    pub(crate) const fn current_iv(&self) -> &[u8; 16] {
        &self.iv
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
