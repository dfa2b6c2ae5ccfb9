//! Typed views of Keycard response templates

mod application_info;
mod application_status;
mod capabilities;
mod keypair;
mod pairing_info;
mod signature;
mod version;

pub use application_info::{ApplicationInfo, CashApplicationInfo};
pub use application_status::ApplicationStatus;
pub use capabilities::Capabilities;
pub use keypair::Keypair;
pub use pairing_info::PairingInfo;
pub use signature::Signature;
pub use version::Version;

use iso7816_tlv::ber::{Tag, Tlv, Value};

use crate::{Error, Result};

/// Parse `data` as a single TLV and check its tag
pub(crate) fn parse_template(data: &[u8], tag: u8) -> Result<Tlv> {
    let (tlv, _) = Tlv::parse(data);
    let tlv = tlv?;
    if tlv.tag() != &Tag::try_from(tag)? {
        return Err(Error::InvalidData("unexpected template tag"));
    }
    Ok(tlv)
}

/// Children of a constructed TLV
pub(crate) fn children(tlv: &Tlv) -> Result<&[Tlv]> {
    match tlv.value() {
        Value::Constructed(tlvs) => Ok(tlvs),
        Value::Primitive(_) => Err(Error::InvalidData("expected a constructed TLV")),
    }
}

/// Value of a primitive TLV with the given tag
pub(crate) fn primitive(tlv: &Tlv, tag: u8) -> Result<&[u8]> {
    if tlv.tag() != &Tag::try_from(tag)? {
        return Err(Error::InvalidData("unexpected tag"));
    }
    match tlv.value() {
        Value::Primitive(bytes) => Ok(bytes),
        Value::Constructed(_) => Err(Error::InvalidData("expected a primitive TLV")),
    }
}

/// Value of the first child primitive with the given tag, if present
pub(crate) fn find_primitive(tlvs: &[Tlv], tag: u8) -> Result<Option<&[u8]>> {
    let tag = Tag::try_from(tag)?;
    for tlv in tlvs {
        if tlv.tag() == &tag {
            return match tlv.value() {
                Value::Primitive(bytes) => Ok(Some(bytes)),
                Value::Constructed(_) => Err(Error::InvalidData("expected a primitive TLV")),
            };
        }
    }
    Ok(None)
}

/// Build a primitive TLV
pub(crate) fn primitive_tlv(tag: u8, value: &[u8]) -> Result<Tlv> {
    Ok(Tlv::new(Tag::try_from(tag)?, Value::Primitive(value.to_vec()))?)
}
