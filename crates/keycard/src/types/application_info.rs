use std::fmt;

use alloy_primitives::hex;
use iso7816_tlv::ber::{Tag, Tlv};
use k256::PublicKey;

use super::{Capabilities, Version, children, find_primitive, primitive};
use crate::{Error, Result, constants::tags};

/// What SELECT reports about the Keycard applet
///
/// A snapshot: it only changes when the applet is selected again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    /// The applet instance exists on the card
    pub installed: bool,
    /// INIT has been run
    pub initialized: bool,
    /// Instance UID (16 bytes once initialized)
    pub instance_uid: Vec<u8>,
    /// Public key used to open secure channels, if the card has one
    pub public_key: Option<PublicKey>,
    /// Applet version
    pub version: Version,
    /// Free pairing slots
    pub available_slots: u8,
    /// UID of the loaded key, empty when no key is loaded
    pub key_uid: Vec<u8>,
    /// Applet capabilities
    pub capabilities: Capabilities,
}

impl ApplicationInfo {
    /// Info for a card without the applet
    pub fn not_installed() -> Self {
        Self {
            installed: false,
            initialized: false,
            instance_uid: Vec::new(),
            public_key: None,
            version: Version::default(),
            available_slots: 0,
            key_uid: Vec::new(),
            capabilities: Capabilities::default(),
        }
    }

    /// Parse the data of a successful SELECT
    ///
    /// An `A4` template means the applet is initialized; a bare `80` public
    /// key means it is installed but waiting for INIT.
    pub fn from_select_response(data: &[u8]) -> Result<Self> {
        let (tlv, _) = Tlv::parse(data);
        let tlv = tlv?;

        if tlv.tag() == &Tag::try_from(tags::ECC_PUBLIC_KEY)? {
            let public_key = parse_public_key(primitive(&tlv, tags::ECC_PUBLIC_KEY)?)?;
            let mut capabilities = Capabilities::CREDENTIALS_MANAGEMENT;
            if public_key.is_some() {
                capabilities = capabilities.union(Capabilities::SECURE_CHANNEL);
            }
            return Ok(Self {
                installed: true,
                public_key,
                capabilities,
                ..Self::not_installed()
            });
        }

        if tlv.tag() != &Tag::try_from(tags::TEMPLATE_APPLICATION_INFO)? {
            return Err(Error::InvalidData("unexpected SELECT response tag"));
        }

        let tlvs = children(&tlv)?;
        let instance_uid = find_primitive(tlvs, tags::INSTANCE_UID)?
            .ok_or(Error::InvalidData("missing instance UID"))?
            .to_vec();
        let public_key = match find_primitive(tlvs, tags::ECC_PUBLIC_KEY)? {
            Some(bytes) => parse_public_key(bytes)?,
            None => None,
        };

        // version and free slots share tag 02 and are told apart by position
        let other = Tag::try_from(tags::OTHER)?;
        let mut others = tlvs.iter().filter(|t| t.tag() == &other);
        let version = match others.next() {
            Some(t) => Version::try_from(primitive(t, tags::OTHER)?)?,
            None => return Err(Error::InvalidData("missing application version")),
        };
        let available_slots = match others.next() {
            Some(t) => *primitive(t, tags::OTHER)?
                .first()
                .ok_or(Error::InvalidData("empty pairing slot count"))?,
            None => return Err(Error::InvalidData("missing pairing slot count")),
        };

        let key_uid = find_primitive(tlvs, tags::KEY_UID)?
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        let capabilities = match find_primitive(tlvs, tags::CAPABILITIES)? {
            Some([bits, ..]) => Capabilities::from_bits(*bits),
            _ => Capabilities::ALL,
        };

        Ok(Self {
            installed: true,
            initialized: true,
            instance_uid,
            public_key,
            version,
            available_slots,
            key_uid,
            capabilities,
        })
    }

    /// Whether a signing key is loaded
    pub fn has_key(&self) -> bool {
        !self.key_uid.is_empty()
    }
}

fn parse_public_key(bytes: &[u8]) -> Result<Option<PublicKey>> {
    match bytes.len() {
        0 => Ok(None),
        65 => Ok(Some(PublicKey::from_sec1_bytes(bytes)?)),
        _ => Err(Error::InvalidData("invalid public key length")),
    }
}

impl fmt::Display for ApplicationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application Info:")?;
        writeln!(f, "  Installed: {}", self.installed)?;
        writeln!(f, "  Initialized: {}", self.initialized)?;
        if !self.initialized {
            return Ok(());
        }
        writeln!(f, "  Instance UID: {}", hex::encode(&self.instance_uid))?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Available pairing slots: {}", self.available_slots)?;
        writeln!(f, "  Key UID: {}", hex::encode(&self.key_uid))?;
        write!(f, "  Capabilities: {}", self.capabilities)
    }
}

/// What SELECT reports about the cash applet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashApplicationInfo {
    /// Cash applet signing key
    pub public_key: PublicKey,
    /// Free-form public data
    pub public_data: Vec<u8>,
    /// Applet version
    pub version: Version,
}

impl CashApplicationInfo {
    /// Parse the `A4` template returned by SELECT
    pub fn from_select_response(data: &[u8]) -> Result<Self> {
        let tlv = super::parse_template(data, tags::TEMPLATE_APPLICATION_INFO)?;
        let tlvs = children(&tlv)?;

        let public_key = find_primitive(tlvs, tags::ECC_PUBLIC_KEY)?
            .ok_or(Error::InvalidData("missing cash public key"))?;
        let public_data = find_primitive(tlvs, tags::CHAIN_CODE)?
            .ok_or(Error::InvalidData("missing cash public data"))?;
        let version = find_primitive(tlvs, tags::OTHER)?
            .ok_or(Error::InvalidData("missing cash version"))?;

        Ok(Self {
            public_key: PublicKey::from_sec1_bytes(public_key)?,
            public_data: public_data.to_vec(),
            version: Version::try_from(version)?,
        })
    }
}
