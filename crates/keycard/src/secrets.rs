//! Personalization secrets
//!
//! [`Secrets`] holds the PIN, PUK and pairing password handed to INIT. They
//! are generated once and returned to the caller.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use nexum_keycard_apdu::RandomSource;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result};

/// PIN length in digits
pub const PIN_LENGTH: usize = 6;
/// PUK length in digits
pub const PUK_LENGTH: usize = 12;

/// How secrets are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretsConfig {
    /// Random bytes behind the pairing password (base64 encoded)
    pub pairing_password_len: usize,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            pairing_password_len: 12,
        }
    }
}

/// PIN, PUK and pairing password of one card
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secrets {
    pin: String,
    puk: String,
    pairing_password: String,
}

impl Secrets {
    /// Use caller chosen secrets; PIN and PUK must be all digits
    pub fn new(
        pin: impl Into<String>,
        puk: impl Into<String>,
        pairing_password: impl Into<String>,
    ) -> Result<Self> {
        let pin = pin.into();
        let puk = puk.into();
        validate_pin(&pin)?;
        validate_puk(&puk)?;
        Ok(Self {
            pin,
            puk,
            pairing_password: pairing_password.into(),
        })
    }

    /// Generate fresh secrets
    pub fn generate(config: &SecretsConfig, rng: &mut dyn RandomSource) -> Self {
        let pin = random_digits(rng, PIN_LENGTH);
        let puk = random_digits(rng, PUK_LENGTH);
        let mut bytes = rng.random_bytes(config.pairing_password_len);
        let pairing_password = URL_SAFE_NO_PAD.encode(&bytes);
        bytes.zeroize();

        Self {
            pin,
            puk,
            pairing_password,
        }
    }

    /// Six digit PIN
    pub fn pin(&self) -> &str {
        &self.pin
    }

    /// Twelve digit PUK
    pub fn puk(&self) -> &str {
        &self.puk
    }

    /// Password the pairing token is derived from
    pub fn pairing_password(&self) -> &str {
        &self.pairing_password
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

/// Check a PIN is exactly six digits
pub fn validate_pin(pin: &str) -> Result<()> {
    if is_digits(pin, PIN_LENGTH) {
        Ok(())
    } else {
        Err(Error::InvalidPin)
    }
}

/// Check a PUK is exactly twelve digits
pub fn validate_puk(puk: &str) -> Result<()> {
    if is_digits(puk, PUK_LENGTH) {
        Ok(())
    } else {
        Err(Error::InvalidPuk)
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

fn random_digits(rng: &mut dyn RandomSource, len: usize) -> String {
    let mut out = String::with_capacity(len);
    let mut byte = [0u8; 1];
    while out.len() < len {
        rng.fill_bytes(&mut byte);
        // 250..=255 would bias the low digits
        if byte[0] < 250 {
            out.push(char::from(b'0' + byte[0] % 10));
        }
    }
    byte.zeroize();
    out
}
