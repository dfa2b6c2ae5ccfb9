use nexum_keycard_apdu::StatusWord;

/// Result type for card manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the card manager
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Codec, channel or transport failure
    #[error(transparent)]
    Apdu(nexum_keycard_apdu::Error),

    /// The card (or the host's view of it) failed cryptographic verification
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(&'static str),

    /// A command completed with a status word the operation does not accept
    #[error("Unexpected response to {operation}: {status}")]
    UnexpectedResponse {
        /// Name of the originating operation
        operation: &'static str,
        /// Status word returned by the card
        status: StatusWord,
    },

    /// The card manager has not been selected in this session
    #[error("Card manager not selected")]
    NotSelected,

    /// INITIALIZE UPDATE returned an unexpected amount of data
    #[error("Invalid INITIALIZE UPDATE response: expected 28 bytes, got {0}")]
    InvalidInitializeUpdateResponse(usize),

    /// The card negotiated a protocol other than SCP02
    #[error("Unsupported secure channel protocol version: {0:#04x}")]
    UnsupportedScpVersion(u8),

    /// The operation must run under an authenticated secure channel
    #[error("Secure channel required")]
    SecureChannelRequired,

    /// Malformed TLV data
    #[error("TLV error: {0:?}")]
    Tlv(iso7816_tlv::TlvError),

    /// Response data did not have the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),
}

impl Error {
    /// Status word carried by this error, if any
    pub const fn status(&self) -> Option<StatusWord> {
        match self {
            Self::UnexpectedResponse { status, .. } => Some(*status),
            Self::Apdu(e) => e.status(),
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
            other => Self::Apdu(other),
        }
    }
}

impl From<iso7816_tlv::TlvError> for Error {
    fn from(err: iso7816_tlv::TlvError) -> Self {
        Self::Tlv(err)
    }
}
