use nexum_keycard_apdu::{SecureChannelError, StatusWord};
use thiserror::Error;

/// Result type for Keycard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Keycard operations
#[derive(Debug, Error)]
pub enum Error {
    /// Codec, channel or transport failure
    #[error(transparent)]
    Apdu(nexum_keycard_apdu::Error),

    /// Card manager failure while installing or deleting
    #[error(transparent)]
    GlobalPlatform(#[from] nexum_keycard_globalplatform::Error),

    /// The card answered with a status word the operation does not accept
    #[error("Unexpected response to {operation}: {status}")]
    UnexpectedResponse {
        /// Name of the originating operation
        operation: &'static str,
        /// Status word returned by the card
        status: StatusWord,
    },

    /// SELECT has not run on this session
    #[error("Keycard applet not selected")]
    NotSelected,

    /// SELECT found no Keycard applet
    #[error("Keycard applet not installed")]
    NotInstalled,

    /// The applet has no credentials yet; run INIT first
    #[error("Keycard applet not initialized")]
    NotInitialized,

    /// INIT on an applet that already has credentials
    #[error("Keycard applet already initialized")]
    AlreadyInitialized,

    /// Installing over an existing applet without `overwrite`
    #[error("Keycard applet already installed")]
    AppletAlreadyInstalled,

    /// No pairing credential set for OPEN SECURE CHANNEL
    #[error("Pairing information missing")]
    PairingInfoMissing,

    /// Operation needs an open secure channel
    #[error("Secure channel required")]
    SecureChannelRequired,

    /// Operation needs a verified PIN
    #[error("PIN verification required")]
    PinVerificationRequired,

    /// Pinless signing with no pinless path set
    #[error("No pinless path registered on the card")]
    PinlessPathRequired,

    /// The card did not prove knowledge of the pairing password
    #[error("Card cryptogram does not match the pairing password")]
    PairingPasswordMismatch,

    /// OPEN SECURE CHANNEL or MUTUALLY AUTHENTICATE failed
    #[error("Opening the secure channel failed: {0}")]
    SecureChannelOpenFailed(&'static str),

    /// A secure channel response failed MAC verification
    #[error("Invalid response MAC")]
    InvalidResponseMac,

    /// GENERATE KEY while a key is loaded
    #[error("A key is already loaded on the card")]
    KeyAlreadyGenerated,

    /// Every pairing slot on the card is taken
    #[error("No available pairing slots")]
    NoAvailablePairingSlots,

    /// PIN rejected by the card
    #[error("Wrong PIN, {retries} attempts left")]
    WrongPin {
        /// Remaining attempts
        retries: u8,
    },

    /// PUK rejected by the card
    #[error("Wrong PUK, {retries} attempts left")]
    WrongPuk {
        /// Remaining attempts
        retries: u8,
    },

    /// No PIN attempts left
    #[error("PIN blocked, unblock it with the PUK")]
    PinBlocked,

    /// Derivation path that does not parse
    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    /// PIN is not six digits
    #[error("PIN must be 6 digits")]
    InvalidPin,

    /// PUK is not twelve digits
    #[error("PUK must be 12 digits")]
    InvalidPuk,

    /// Card data or caller input with the wrong shape
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),

    /// BIP39 seed of the wrong length
    #[error("Seed must be 64 bytes, got {0}")]
    InvalidSeedLength(usize),

    /// Signing input that is not a 32 byte hash
    #[error("Hash must be 32 bytes, got {0}")]
    InvalidHashLength(usize),

    /// Unsupported mnemonic word count
    #[error("Mnemonic must have 12, 15, 18, 21 or 24 words, got {0}")]
    InvalidMnemonicLength(u8),

    /// Malformed BER-TLV data
    #[error("TLV error: {0:?}")]
    Tlv(iso7816_tlv::TlvError),

    /// Mnemonic phrase rejected
    #[error(transparent)]
    Mnemonic(#[from] coins_bip39::MnemonicError),

    /// Word index outside the BIP39 word list
    #[error(transparent)]
    Wordlist(#[from] coins_bip39::WordlistError),

    /// Invalid curve point or scalar
    #[error("Elliptic curve error")]
    EllipticCurve(#[from] k256::elliptic_curve::Error),

    /// Signature encoding or recovery failed
    #[error("ECDSA error")]
    Ecdsa(#[from] k256::ecdsa::Error),
}

impl Error {
    /// Status word carried by this error, if any
    pub const fn status(&self) -> Option<StatusWord> {
        match self {
            Self::UnexpectedResponse { status, .. } => Some(*status),
            Self::Apdu(e) => e.status(),
            Self::GlobalPlatform(e) => e.status(),
            _ => None,
        }
    }
}

impl From<nexum_keycard_apdu::Error> for Error {
    fn from(err: nexum_keycard_apdu::Error) -> Self {
        match err {
            nexum_keycard_apdu::Error::UnexpectedResponse { operation, status } => {
                Self::UnexpectedResponse { operation, status }
            }
            nexum_keycard_apdu::Error::SecureChannel(SecureChannelError::InvalidMac) => {
                Self::InvalidResponseMac
            }
            other => Self::Apdu(other),
        }
    }
}

impl From<iso7816_tlv::TlvError> for Error {
    fn from(err: iso7816_tlv::TlvError) -> Self {
        Self::Tlv(err)
    }
}
