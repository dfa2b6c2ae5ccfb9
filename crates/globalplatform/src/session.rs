//! SCP02 session state
//!
//! A [`Session`] is created from the INITIALIZE UPDATE exchange. It checks the
//! card cryptogram, derives the session keys and provides the host cryptogram
//! for EXTERNAL AUTHENTICATE.

use std::fmt;

use cipher::Key;
use nexum_keycard_apdu::{Channel, RandomSource};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    Error, Result,
    commands::InitializeUpdateCommand,
    constants::{DEFAULT_KEY, derivation, scp},
    crypto::{
        CardChallenge, Cryptogram, HostChallenge, Scp02, SequenceCounter, card_cryptogram,
        derive_key, host_cryptogram,
    },
};

/// Length of the INITIALIZE UPDATE response data
pub const INITIALIZE_UPDATE_RESPONSE_LEN: usize = 28;

/// Static card manager keys
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Scp02Keys {
    enc: [u8; 16],
    mac: [u8; 16],
    dek: [u8; 16],
}

impl Scp02Keys {
    /// Create a key set from its three components
    pub const fn new(enc: [u8; 16], mac: [u8; 16], dek: [u8; 16]) -> Self {
        Self { enc, mac, dek }
    }

    /// Use the same key for every purpose
    pub const fn from_single_key(key: [u8; 16]) -> Self {
        Self::new(key, key, key)
    }

    /// Static encryption key
    pub fn enc(&self) -> &Key<Scp02> {
        Key::<Scp02>::from_slice(&self.enc)
    }

    /// Static MAC key
    pub fn mac(&self) -> &Key<Scp02> {
        Key::<Scp02>::from_slice(&self.mac)
    }

    /// Static data encryption key
    pub fn dek(&self) -> &Key<Scp02> {
        Key::<Scp02>::from_slice(&self.dek)
    }
}

impl Default for Scp02Keys {
    fn default() -> Self {
        Self::from_single_key(DEFAULT_KEY)
    }
}

impl fmt::Debug for Scp02Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scp02Keys").finish_non_exhaustive()
    }
}

/// Keys and challenges of one SCP02 session
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Session {
    enc: [u8; 16],
    mac: [u8; 16],
    dek: [u8; 16],
    #[zeroize(skip)]
    key_diversification: [u8; 10],
    #[zeroize(skip)]
    key_version: u8,
    #[zeroize(skip)]
    sequence_counter: SequenceCounter,
    #[zeroize(skip)]
    card_challenge: CardChallenge,
    #[zeroize(skip)]
    host_challenge: HostChallenge,
}

impl Session {
    /// Run INITIALIZE UPDATE over `channel` and build the session from the answer
    pub fn initialize<C: Channel>(
        channel: &mut C,
        keys: &Scp02Keys,
        rng: &mut dyn RandomSource,
    ) -> Result<Self> {
        let mut host_challenge = HostChallenge::default();
        rng.fill_bytes(&mut host_challenge);

        let response = channel.execute(&InitializeUpdateCommand::new(host_challenge))?;
        Self::new(keys, &response, host_challenge)
    }

    /// Validate an INITIALIZE UPDATE response and derive the session keys
    ///
    /// Layout: key diversification (10) ‖ key version (1) ‖ SCP version (1) ‖
    /// sequence counter (2) ‖ card challenge (6) ‖ card cryptogram (8).
    pub fn new(keys: &Scp02Keys, response: &[u8], host_challenge: HostChallenge) -> Result<Self> {
        let response: &[u8; INITIALIZE_UPDATE_RESPONSE_LEN] = response
            .try_into()
            .map_err(|_| Error::InvalidInitializeUpdateResponse(response.len()))?;

        let scp_version = response[11];
        if scp_version != scp::SCP02 {
            return Err(Error::UnsupportedScpVersion(scp_version));
        }

        let mut key_diversification = [0u8; 10];
        key_diversification.copy_from_slice(&response[..10]);
        let mut sequence_counter = SequenceCounter::default();
        sequence_counter.copy_from_slice(&response[12..14]);
        let mut card_challenge = CardChallenge::default();
        card_challenge.copy_from_slice(&response[14..20]);

        let enc = derive_key(keys.enc(), &sequence_counter, &derivation::ENC);
        let mac = derive_key(keys.mac(), &sequence_counter, &derivation::MAC);
        let dek = derive_key(keys.dek(), &sequence_counter, &derivation::DEK);

        let expected = card_cryptogram(&enc, &sequence_counter, &card_challenge, &host_challenge);
        if expected[..] != response[20..28] {
            warn!("card cryptogram mismatch");
            return Err(Error::AuthenticationFailed("invalid card cryptogram"));
        }

        debug!(
            key_version = response[10],
            sequence_counter = u16::from_be_bytes(sequence_counter),
            "card cryptogram verified"
        );

        Ok(Self {
            enc: enc.into(),
            mac: mac.into(),
            dek: dek.into(),
            key_diversification,
            key_version: response[10],
            sequence_counter,
            card_challenge,
            host_challenge,
        })
    }

    /// Cryptogram sent in EXTERNAL AUTHENTICATE
    pub fn host_cryptogram(&self) -> Cryptogram {
        host_cryptogram(
            self.enc_key(),
            &self.sequence_counter,
            &self.card_challenge,
            &self.host_challenge,
        )
    }

    /// Session encryption key
    pub fn enc_key(&self) -> &Key<Scp02> {
        Key::<Scp02>::from_slice(&self.enc)
    }

    /// Session C-MAC key
    pub fn mac_key(&self) -> &Key<Scp02> {
        Key::<Scp02>::from_slice(&self.mac)
    }

    /// Session data encryption key
    pub fn dek_key(&self) -> &Key<Scp02> {
        Key::<Scp02>::from_slice(&self.dek)
    }

    /// Key diversification data reported by the card
    pub const fn key_diversification(&self) -> &[u8; 10] {
        &self.key_diversification
    }

    /// Key version number reported by the card
    pub const fn key_version(&self) -> u8 {
        self.key_version
    }

    /// Sequence counter
    pub const fn sequence_counter(&self) -> &SequenceCounter {
        &self.sequence_counter
    }

    /// Card challenge
    pub const fn card_challenge(&self) -> &CardChallenge {
        &self.card_challenge
    }

    /// Host challenge
    pub const fn host_challenge(&self) -> &HostChallenge {
        &self.host_challenge
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key_version", &self.key_version)
            .field("sequence_counter", &self.sequence_counter)
            .finish_non_exhaustive()
    }
}
