use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Durable credential minted by the pairing handshake
///
/// The caller stores it; the library never persists it.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PairingInfo {
    /// Pairing key shared with the card
    pub key: [u8; 32],
    /// Pairing slot on the card
    #[zeroize(skip)]
    pub index: u8,
}

impl PairingInfo {
    /// Pairing credential for slot `index`
    pub const fn new(key: [u8; 32], index: u8) -> Self {
        Self { key, index }
    }
}

impl fmt::Debug for PairingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingInfo")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
