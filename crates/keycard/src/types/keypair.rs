use std::fmt;

use alloy_primitives::Address;
use iso7816_tlv::ber::{Tag, Value};
use k256::{PublicKey, SecretKey, ecdsa::VerifyingKey};

use super::{children, parse_template, primitive};
use crate::{Error, Result, constants::tags};

/// Keypair template (tag `A1`) returned by EXPORT KEY
///
/// Which components are present depends on what was requested and on the
/// applet's export policy.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Keypair {
    /// Public key, tag `80`
    pub public_key: Option<PublicKey>,
    /// Private key, tag `81`
    pub private_key: Option<SecretKey>,
    /// BIP32 chain code, tag `82`
    pub chain_code: Option<Vec<u8>>,
}

impl Keypair {
    /// Whether a chain code was exported with the key
    pub const fn is_extended(&self) -> bool {
        self.chain_code.is_some()
    }

    /// Ethereum address of the public key
    pub fn address(&self) -> Option<Address> {
        self.public_key
            .map(|key| Address::from_public_key(&VerifyingKey::from(&key)))
    }
}

impl TryFrom<&[u8]> for Keypair {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        let tlv = parse_template(data, tags::TEMPLATE_KEYPAIR)?;

        let public_tag = Tag::try_from(tags::ECC_PUBLIC_KEY)?;
        let private_tag = Tag::try_from(tags::ECC_PRIVATE_KEY)?;
        let chain_tag = Tag::try_from(tags::CHAIN_CODE)?;

        let mut keypair = Self::default();

        for tlv in children(&tlv)? {
            let tag = tlv.tag();
            if !matches!(tlv.value(), Value::Primitive(_)) {
                continue;
            }

            if tag == &public_tag {
                let bytes = primitive(tlv, tags::ECC_PUBLIC_KEY)?;
                if !bytes.is_empty() {
                    keypair.public_key = Some(PublicKey::from_sec1_bytes(bytes)?);
                }
            } else if tag == &private_tag {
                keypair.private_key = Some(SecretKey::from_slice(primitive(tlv, tags::ECC_PRIVATE_KEY)?)?);
            } else if tag == &chain_tag {
                keypair.chain_code = Some(primitive(tlv, tags::CHAIN_CODE)?.to_vec());
            }
        }

        Ok(keypair)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .field("has_private_key", &self.private_key.is_some())
            .field("extended", &self.is_extended())
            .finish()
    }
}

impl fmt::Display for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address() {
            Some(address) => write!(f, "{address}")?,
            None => f.write_str("<no public key>")?,
        }
        if self.private_key.is_some() {
            f.write_str(" +private")?;
        }
        if self.is_extended() {
            f.write_str(" +chain code")?;
        }
        Ok(())
    }
}
