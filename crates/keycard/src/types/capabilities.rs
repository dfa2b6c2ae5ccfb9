use std::fmt;

/// Capabilities advertised by the applet (tag `8D`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Secure channel support
    pub const SECURE_CHANNEL: Self = Self(0x01);
    /// Key generation, derivation and signing
    pub const KEY_MANAGEMENT: Self = Self(0x02);
    /// PIN, PUK and pairing secret management
    pub const CREDENTIALS_MANAGEMENT: Self = Self(0x04);
    /// NDEF record storage
    pub const NDEF: Self = Self(0x08);
    /// Everything; assumed for applets too old to report capabilities
    pub const ALL: Self = Self(0x0F);

    /// Capabilities from the raw bitmask
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bitmask
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every capability in `other` is present
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of both sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::SECURE_CHANNEL, "secure channel"),
            (Self::KEY_MANAGEMENT, "key management"),
            (Self::CREDENTIALS_MANAGEMENT, "credentials management"),
            (Self::NDEF, "NDEF"),
        ];
        let present: Vec<&str> = names
            .iter()
            .filter(|(cap, _)| self.contains(*cap))
            .map(|(_, name)| *name)
            .collect();

        if present.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", present.join(", "))
        }
    }
}
