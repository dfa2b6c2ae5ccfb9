use std::fmt;

use alloy_primitives::{Address, hex};
use iso7816_tlv::ber::{Tag, Value};
use k256::{
    PublicKey,
    ecdsa::{self, RecoveryId, VerifyingKey},
};

use super::{children, find_primitive, parse_template};
use crate::{Error, Result, constants::tags};

/// ECDSA signature produced by the card
///
/// `s` is normalized to the lower half of the curve order and `v` is the
/// recovery id matching the public key the card reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
    pub public_key: PublicKey,
}

impl Signature {
    /// Parse a signature template (tag `A0`) returned for `hash`
    ///
    /// Layout: `A0 { 80 public key, 30 { 02 r, 02 s } }`.
    pub fn from_response(hash: &[u8; 32], data: &[u8]) -> Result<Self> {
        let tlv = parse_template(data, tags::TEMPLATE_SIGNATURE)?;
        let tlvs = children(&tlv)?;

        let public_key = find_primitive(tlvs, tags::ECC_PUBLIC_KEY)?
            .ok_or(Error::InvalidData("missing signature public key"))?;
        let public_key = PublicKey::from_sec1_bytes(public_key)?;

        let sequence = Tag::try_from(tags::ECDSA_SIGNATURE)?;
        let components = match tlvs.iter().find(|t| t.tag() == &sequence).map(|t| t.value()) {
            Some(Value::Constructed(components)) => components,
            _ => return Err(Error::InvalidData("missing ECDSA signature")),
        };
        let [r, s] = components.as_slice() else {
            return Err(Error::InvalidData("ECDSA signature must hold r and s"));
        };
        let r = der_integer(super::primitive(r, tags::OTHER)?)?;
        let s = der_integer(super::primitive(s, tags::OTHER)?)?;

        let mut signature = ecdsa::Signature::from_scalars(r, s)?;
        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
        }

        let verifying_key = VerifyingKey::from(&public_key);
        let recovery_id = RecoveryId::trial_recovery_from_prehash(&verifying_key, hash, &signature)?;

        let (r, s) = signature.split_bytes();
        Ok(Self {
            r: r.into(),
            s: s.into(),
            v: recovery_id.to_byte(),
            public_key,
        })
    }

    /// The signature as a `k256` value
    pub fn to_ecdsa(&self) -> Result<ecdsa::Signature> {
        Ok(ecdsa::Signature::from_scalars(self.r, self.s)?)
    }

    /// The signature with its parity, as used by Ethereum tooling
    pub fn to_alloy(&self) -> Result<alloy_primitives::Signature> {
        let recovery_id =
            RecoveryId::from_byte(self.v).ok_or(Error::InvalidData("invalid recovery id"))?;
        Ok(alloy_primitives::Signature::from((self.to_ecdsa()?, recovery_id)))
    }

    /// `r ‖ s ‖ v`
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// Ethereum address of the signing key
    pub fn address(&self) -> Address {
        Address::from_public_key(&VerifyingKey::from(&self.public_key))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(self.to_bytes()))
    }
}

/// DER INTEGER content as a 32-byte big-endian scalar
fn der_integer(bytes: &[u8]) -> Result<[u8; 32]> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    if trimmed.len() > 32 {
        return Err(Error::InvalidData("signature component too long"));
    }

    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::{ecdsa::SigningKey, elliptic_curve::sec1::ToEncodedPoint};

    /// Encode a signature template the way the applet does
    fn encode_template(public_key: &PublicKey, signature: &ecdsa::Signature) -> Vec<u8> {
        fn integer(bytes: &[u8]) -> Vec<u8> {
            let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
            let mut value = bytes[start..].to_vec();
            if value[0] & 0x80 != 0 {
                value.insert(0, 0);
            }
            let mut out = vec![0x02, value.len() as u8];
            out.extend(value);
            out
        }

        let (r, s) = signature.split_bytes();
        let mut sequence = integer(&r);
        sequence.extend(integer(&s));

        let mut body = vec![0x80, 0x41];
        body.extend_from_slice(public_key.to_encoded_point(false).as_bytes());
        body.push(0x30);
        body.push(sequence.len() as u8);
        body.extend(sequence);

        let mut out = vec![0xA0];
        if body.len() > 0x7F {
            out.push(0x81);
        }
        out.push(body.len() as u8);
        out.extend(body);
        out
    }

    #[test]
    fn test_parse_signature_recovers_v() {
        let key = SigningKey::from_slice(&[0x17; 32]).unwrap();
        let hash = [0xAB; 32];
        let (signature, recovery_id) = key.sign_prehash_recoverable(&hash).unwrap();
        let public_key = PublicKey::from(key.verifying_key());

        let parsed =
            Signature::from_response(&hash, &encode_template(&public_key, &signature)).unwrap();
        assert_eq!(parsed.public_key, public_key);
        assert_eq!(parsed.v, recovery_id.to_byte());
        assert_eq!(parsed.to_ecdsa().unwrap(), signature);

        let alloy = parsed.to_alloy().unwrap();
        assert_eq!(
            alloy.recover_address_from_prehash(&hash.into()).unwrap(),
            parsed.address()
        );

        let display = parsed.to_string();
        assert_eq!(display.len(), 2 + 65 * 2);
        assert_eq!(display, format!("0x{}", hex::encode(parsed.to_bytes())));
        assert!(display.ends_with(&format!("{:02x}", parsed.v)));
    }

    #[test]
    fn test_der_integer() {
        let mut long = vec![0x00];
        long.extend_from_slice(&[0xFF; 32]);
        assert_eq!(der_integer(&long).unwrap(), [0xFF; 32]);

        let short = der_integer(&[0x01, 0x02]).unwrap();
        assert_eq!(short[30..], [0x01, 0x02]);
        assert!(short[..30].iter().all(|b| *b == 0));

        assert!(der_integer(&[0x01; 33]).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_template() {
        assert!(Signature::from_response(&[0; 32], &[0xA1, 0x00]).is_err());
        assert!(Signature::from_response(&[0; 32], &[0xA0, 0x00]).is_err());
    }
}
