//! Keycard command set
//!
//! [`Keycard`] owns the transport and tracks where the session stands:
//! selected, initialized, paired, secure channel open, PIN verified. Every
//! operation checks its preconditions against that state before a single
//! byte goes to the card.

use std::{fmt, mem};

use alloy_primitives::eip191_hash_message;
use coins_bip39::{English, Mnemonic};
use nexum_keycard_apdu::{
    ApduCommand, CardTransport, Channel, Command, PlainChannel, RandomSource, Response,
    SystemRandom, TransportError,
};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::{
    Error, Result,
    commands::{
        ChangeCredentialCommand, DeriveKeyCommand, DeriveMode, ExportKeyCommand, ExportOption,
        FactoryResetCommand, GenerateKeyCommand, GenerateMnemonicCommand, GetKeyPathCommand,
        GetStatusCommand, InitCommand, KeyUid, LoadKeyCommand, RemoveKeyCommand, SelectCommand,
        SetPinlessPathCommand, SignCommand, UnblockPinCommand, UnpairCommand, VerifyPinCommand,
    },
    constants::{DEFAULT_INSTANCE_INDEX, MAX_PAIRING_SLOTS, keycard_instance_aid},
    pairing,
    path::KeyPath,
    secrets::{Secrets, SecretsConfig},
    secure_channel::KeycardSecureChannel,
    session::Session,
    types::{ApplicationInfo, ApplicationStatus, Keypair, PairingInfo, Signature},
};

/// Where a [`Keycard`] session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CardState {
    /// Nothing selected yet
    Unselected,
    /// SELECT found no applet instance
    NotInstalled,
    /// Applet installed, INIT not run
    Uninitialized,
    /// Applet initialized, no pairing credential set
    Initialized,
    /// Pairing credential set, no secure channel
    Paired,
    /// Secure channel open
    SecureChannelOpen,
    /// Secure channel open and PIN verified
    PinVerified,
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Unselected => "unselected",
            Self::NotInstalled => "not installed",
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Paired => "paired",
            Self::SecureChannelOpen => "secure channel open",
            Self::PinVerified => "PIN verified",
        };
        f.write_str(state)
    }
}

#[derive(Debug)]
enum Link<T: CardTransport> {
    Plain(PlainChannel<T>),
    Secure(KeycardSecureChannel<PlainChannel<T>>),
    // only observable while a handshake is in flight
    Detached,
}

impl<T: CardTransport> Link<T> {
    fn into_plain(self) -> Option<PlainChannel<T>> {
        match self {
            Self::Plain(channel) => Some(channel),
            Self::Secure(channel) => Some(channel.into_inner()),
            Self::Detached => None,
        }
    }
}

impl<T: CardTransport> Channel for Link<T> {
    fn send(&mut self, command: &Command) -> nexum_keycard_apdu::Result<Response> {
        match self {
            Self::Plain(channel) => channel.send(command),
            Self::Secure(channel) => channel.send(command),
            Self::Detached => Err(TransportError::Connection("channel detached".into()).into()),
        }
    }
}

/// Keycard applet session over a transport
#[derive(Debug)]
pub struct Keycard<T: CardTransport> {
    link: Link<T>,
    rng: Box<dyn RandomSource>,
    instance: u8,
    secrets_config: SecretsConfig,
    info: Option<ApplicationInfo>,
    pairing: Option<PairingInfo>,
    pin_verified: bool,
}

impl<T: CardTransport> Keycard<T> {
    /// Talk to the default applet instance using the system CSPRNG
    pub fn new(transport: T) -> Self {
        Self::with_random(transport, SystemRandom)
    }

    /// Use `rng` for challenges, ephemeral keys, IVs and generated secrets
    pub fn with_random(transport: T, rng: impl RandomSource + 'static) -> Self {
        Self {
            link: Link::Plain(PlainChannel::new(transport)),
            rng: Box::new(rng),
            instance: DEFAULT_INSTANCE_INDEX,
            secrets_config: SecretsConfig::default(),
            info: None,
            pairing: None,
            pin_verified: false,
        }
    }

    /// Talk to applet instance `index` instead of the default one
    pub const fn with_instance(mut self, index: u8) -> Self {
        self.instance = index;
        self
    }

    /// Shape of the secrets generated by [`init`](Self::init)
    pub const fn with_secrets_config(mut self, config: SecretsConfig) -> Self {
        self.secrets_config = config;
        self
    }

    /// Select the applet instance
    ///
    /// Drops any open secure channel. A missing applet is reported through
    /// [`ApplicationInfo::installed`], not as an error.
    pub fn select(&mut self) -> Result<ApplicationInfo> {
        self.drop_secure_channel();
        let info = self
            .link
            .execute(&SelectCommand::with_aid(keycard_instance_aid(self.instance)))?;
        debug!(
            installed = info.installed,
            initialized = info.initialized,
            "keycard selected"
        );
        self.info = Some(info.clone());
        Ok(info)
    }

    /// Snapshot from the last SELECT
    pub const fn application_info(&self) -> Option<&ApplicationInfo> {
        self.info.as_ref()
    }

    /// Personalize the applet with freshly generated secrets
    ///
    /// The secrets are returned to the caller and never kept.
    pub fn init(&mut self) -> Result<Secrets> {
        self.check_uninitialized()?;
        let secrets = Secrets::generate(&self.secrets_config, &mut *self.rng);
        self.init_with_secrets(&secrets)?;
        Ok(secrets)
    }

    /// Personalize the applet with caller-chosen secrets
    pub fn init_with_secrets(&mut self, secrets: &Secrets) -> Result<()> {
        let card_key = self.check_uninitialized()?;
        let command = InitCommand::new(&card_key, secrets, &mut *self.rng);
        self.link.execute(&command)?;
        info!("keycard initialized");

        self.select()?;
        Ok(())
    }

    /// Pair with the card and keep the resulting credential
    ///
    /// PAIR runs outside the secure channel; an open one is dropped first.
    pub fn pair(&mut self, password: &str) -> Result<PairingInfo> {
        self.check_initialized()?;
        self.drop_secure_channel();

        let info = pairing::pair(&mut self.link, password, &mut *self.rng)?;
        self.pairing = Some(info.clone());
        Ok(info)
    }

    /// Use a credential from an earlier pairing
    pub fn set_pairing_info(&mut self, pairing: PairingInfo) {
        self.pairing = Some(pairing);
    }

    /// Credential used to open secure channels
    pub const fn pairing_info(&self) -> Option<&PairingInfo> {
        self.pairing.as_ref()
    }

    /// Open the secure channel with the stored pairing credential
    ///
    /// On failure the session is discarded and the plain channel kept.
    pub fn open_secure_channel(&mut self) -> Result<()> {
        let info = self.check_initialized()?;
        let card_key = info
            .public_key
            .ok_or(Error::InvalidData("card did not report a secure channel key"))?;
        let pairing = self.pairing.clone().ok_or(Error::PairingInfoMissing)?;

        self.pin_verified = false;
        let mut plain = self.detach()?;

        let session = match Session::open(&mut plain, &card_key, &pairing, &mut *self.rng) {
            Ok(session) => session,
            Err(e) => {
                self.link = Link::Plain(plain);
                return Err(e);
            }
        };

        let mut secure = KeycardSecureChannel::new(plain, session);
        match secure.authenticate(&mut *self.rng) {
            Ok(()) => {
                self.link = Link::Secure(secure);
                Ok(())
            }
            Err(e) => {
                self.link = Link::Plain(secure.into_inner());
                Err(e)
            }
        }
    }

    /// Verify the user PIN
    pub fn verify_pin(&mut self, pin: &str) -> Result<()> {
        let command = VerifyPinCommand::new(pin)?;
        let result = self.secure()?.execute(&command);
        self.pin_verified = result.is_ok();
        result
    }

    /// Replace the PIN
    pub fn change_pin(&mut self, new_pin: &str) -> Result<()> {
        let command = ChangeCredentialCommand::pin(new_pin)?;
        self.authenticated()?.execute(&command)
    }

    /// Replace the PUK
    pub fn change_puk(&mut self, new_puk: &str) -> Result<()> {
        let command = ChangeCredentialCommand::puk(new_puk)?;
        self.authenticated()?.execute(&command)
    }

    /// Replace the pairing password; existing pairings stay valid
    pub fn change_pairing_secret(&mut self, new_password: &str) -> Result<()> {
        let command = ChangeCredentialCommand::pairing_secret(new_password);
        self.authenticated()?.execute(&command)
    }

    /// Reset a blocked PIN with the PUK
    pub fn unblock_pin(&mut self, puk: &str, new_pin: &str) -> Result<()> {
        let command = UnblockPinCommand::new(puk, new_pin)?;
        self.secure()?.execute(&command)
    }

    /// Free pairing slot `index`
    ///
    /// Freeing our own slot forgets the stored credential.
    pub fn unpair(&mut self, index: u8) -> Result<()> {
        let command = UnpairCommand::new(index)?;
        self.authenticated()?.execute(&command)?;

        if self.pairing.as_ref().is_some_and(|p| p.index == index) {
            self.pairing = None;
        }
        debug!(index, "unpaired");
        Ok(())
    }

    /// Free every pairing slot except ours
    pub fn unpair_others(&mut self) -> Result<()> {
        let own = self
            .pairing
            .as_ref()
            .map(|p| p.index)
            .ok_or(Error::PairingInfoMissing)?;
        let channel = self.authenticated()?;

        for index in (0..MAX_PAIRING_SLOTS).filter(|&i| i != own) {
            channel.execute(&UnpairCommand::new(index)?)?;
        }
        Ok(())
    }

    /// PIN/PUK retry counters and key state
    pub fn get_status(&mut self) -> Result<ApplicationStatus> {
        self.secure()?.execute(&GetStatusCommand)
    }

    /// Path of the current key
    pub fn get_key_path(&mut self) -> Result<KeyPath> {
        self.secure()?.execute(&GetKeyPathCommand)
    }

    /// Generate a master key on the card
    ///
    /// The key state is read from GET STATUS rather than the SELECT snapshot,
    /// which goes stale when another session loads a key. Fails with
    /// [`Error::KeyAlreadyGenerated`] while a key is loaded.
    pub fn generate_key(&mut self) -> Result<KeyUid> {
        let channel = self.authenticated()?;
        if channel.execute(&GetStatusCommand)?.key_initialized {
            return Err(Error::KeyAlreadyGenerated);
        }

        let uid = channel.execute(&GenerateKeyCommand)?;
        self.set_key_uid(&uid);
        info!("key generated");
        Ok(uid)
    }

    /// Delete the loaded key
    pub fn remove_key(&mut self) -> Result<()> {
        self.authenticated()?.execute(&RemoveKeyCommand)?;
        if let Some(info) = &mut self.info {
            info.key_uid.clear();
        }
        Ok(())
    }

    /// Make the key at `path` the current key
    pub fn derive_key(&mut self, path: &str) -> Result<()> {
        let path: KeyPath = path.parse()?;
        self.authenticated()?.execute(&DeriveKeyCommand::new(path))
    }

    /// Export the key at `path` without changing the current key
    pub fn export_key(
        &mut self,
        path: &str,
        include_private: bool,
        include_public: bool,
    ) -> Result<Keypair> {
        let option = match (include_private, include_public) {
            (true, _) => ExportOption::PrivateAndPublic,
            (false, true) => ExportOption::PublicOnly,
            (false, false) => return Err(Error::InvalidData("nothing to export")),
        };
        let path: KeyPath = path.parse()?;
        self.authenticated()?
            .execute(&ExportKeyCommand::with_path(path, DeriveMode::Temporary, option))
    }

    /// Export the current key
    pub fn export_current_key(&mut self, option: ExportOption) -> Result<Keypair> {
        self.authenticated()?.execute(&ExportKeyCommand::current(option))
    }

    /// Load a 64-byte BIP39 seed
    pub fn load_seed(&mut self, seed: &[u8]) -> Result<KeyUid> {
        let command = LoadKeyCommand::seed(seed)?;
        let uid = self.authenticated()?.execute(&command)?;
        self.set_key_uid(&uid);
        Ok(uid)
    }

    /// Load the seed of a BIP39 phrase
    pub fn load_mnemonic(&mut self, phrase: &str, passphrase: Option<&str>) -> Result<KeyUid> {
        let mnemonic = Mnemonic::<English>::new_from_phrase(phrase)?;
        let seed = Zeroizing::new(mnemonic.to_seed(passphrase)?);
        self.load_seed(seed.as_ref())
    }

    /// Have the card pick a mnemonic; it is not loaded
    pub fn generate_mnemonic(&mut self, words: u8) -> Result<Mnemonic<English>> {
        let command = GenerateMnemonicCommand::with_words(words)?;
        self.secure()?.execute(&command)
    }

    /// Sign a 32-byte hash with the current key
    pub fn sign(&mut self, hash: &[u8]) -> Result<Signature> {
        let command = SignCommand::current(hash)?;
        self.authenticated()?.execute(&command)
    }

    /// Sign with the key at `path`, leaving the current key unchanged
    pub fn sign_with_path(&mut self, hash: &[u8], path: &str) -> Result<Signature> {
        let path: KeyPath = path.parse()?;
        let command = SignCommand::with_path(hash, &path, DeriveMode::Temporary)?;
        self.authenticated()?.execute(&command)
    }

    /// Sign with the registered pinless path
    ///
    /// Needs neither PIN nor secure channel; uses the secure channel when one
    /// is open.
    pub fn sign_pinless(&mut self, hash: &[u8]) -> Result<Signature> {
        let command = SignCommand::pinless(hash)?;
        self.check_initialized()?;
        self.link.execute(&command)
    }

    /// Register the key allowed to sign without a PIN
    pub fn set_pinless_path(&mut self, path: &str) -> Result<()> {
        let command = SetPinlessPathCommand::new(path.parse()?)?;
        self.authenticated()?.execute(&command)
    }

    /// Unregister the pinless path
    pub fn clear_pinless_path(&mut self) -> Result<()> {
        self.authenticated()?
            .execute(&SetPinlessPathCommand::clear())
    }

    /// Sign an EIP-191 personal message with the current key
    pub fn sign_message(&mut self, message: &[u8]) -> Result<Signature> {
        self.sign(eip191_hash_message(message).as_slice())
    }

    /// Sign an EIP-191 personal message with the pinless path key
    pub fn sign_message_pinless(&mut self, message: &[u8]) -> Result<Signature> {
        self.sign_pinless(eip191_hash_message(message).as_slice())
    }

    /// Wipe keys, credentials and pairings, then select again
    pub fn factory_reset(&mut self) -> Result<ApplicationInfo> {
        if self.info.is_none() {
            return Err(Error::NotSelected);
        }
        self.drop_secure_channel();
        self.link.execute(&FactoryResetCommand)?;
        self.pairing = None;
        info!("keycard factory reset");
        self.select()
    }

    /// Current session state
    pub fn state(&self) -> CardState {
        match &self.info {
            None => CardState::Unselected,
            Some(info) if !info.installed => CardState::NotInstalled,
            Some(info) if !info.initialized => CardState::Uninitialized,
            Some(_) => match (&self.link, self.pin_verified) {
                (Link::Secure(_), true) => CardState::PinVerified,
                (Link::Secure(_), false) => CardState::SecureChannelOpen,
                _ if self.pairing.is_some() => CardState::Paired,
                _ => CardState::Initialized,
            },
        }
    }

    /// Release the transport
    ///
    /// Returns `None` only if a handshake was interrupted by a panic.
    pub fn into_transport(self) -> Option<T> {
        self.link.into_plain().map(PlainChannel::into_inner)
    }

    /// Run an arbitrary command on whatever channel is active
    pub fn execute<A: ApduCommand>(&mut self, command: &A) -> std::result::Result<A::Success, A::Error> {
        self.link.execute(command)
    }

    fn check_uninitialized(&self) -> Result<k256::PublicKey> {
        let info = self.info.as_ref().ok_or(Error::NotSelected)?;
        if !info.installed {
            return Err(Error::NotInstalled);
        }
        if info.initialized {
            return Err(Error::AlreadyInitialized);
        }
        info.public_key
            .ok_or(Error::InvalidData("card did not report a secure channel key"))
    }

    fn check_initialized(&self) -> Result<&ApplicationInfo> {
        let info = self.info.as_ref().ok_or(Error::NotSelected)?;
        if !info.installed {
            return Err(Error::NotInstalled);
        }
        if !info.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(info)
    }

    fn secure(&mut self) -> Result<&mut KeycardSecureChannel<PlainChannel<T>>> {
        match &mut self.link {
            Link::Secure(channel) => Ok(channel),
            _ => Err(Error::SecureChannelRequired),
        }
    }

    fn authenticated(&mut self) -> Result<&mut KeycardSecureChannel<PlainChannel<T>>> {
        if !matches!(self.link, Link::Secure(_)) {
            return Err(Error::SecureChannelRequired);
        }
        if !self.pin_verified {
            return Err(Error::PinVerificationRequired);
        }
        self.secure()
    }

    fn set_key_uid(&mut self, uid: &KeyUid) {
        if let Some(info) = &mut self.info {
            info.key_uid = uid.to_vec();
        }
    }

    fn detach(&mut self) -> Result<PlainChannel<T>> {
        mem::replace(&mut self.link, Link::Detached)
            .into_plain()
            .ok_or_else(|| {
                nexum_keycard_apdu::Error::from(TransportError::Connection(
                    "channel detached".into(),
                ))
                .into()
            })
    }

    fn drop_secure_channel(&mut self) {
        self.pin_verified = false;
        if matches!(self.link, Link::Secure(_)) {
            let link = mem::replace(&mut self.link, Link::Detached);
            self.link = link.into_plain().map_or(Link::Detached, Link::Plain);
        }
    }
}
