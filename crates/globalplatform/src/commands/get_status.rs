use bytes::Bytes;
use iso7816_tlv::ber::{Tlv, Value};
use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::constants::{cla, get_status, ins, tags};
use crate::{Error, Result};

/// Registry entry of the issuer security domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerSecurityDomainStatus {
    /// AID of the security domain
    pub aid: Bytes,
    /// Card life cycle state (`01` OP_READY ... `0F` SECURED, `7F` locked)
    pub life_cycle: u8,
    /// Privileges, when reported
    pub privileges: Option<Bytes>,
}

/// GET STATUS for the issuer security domain
#[derive(Debug, Clone, Default)]
pub struct GetStatusCommand;

impl GetStatusCommand {
    /// Query the issuer security domain
    pub const fn issuer_security_domain() -> Self {
        Self
    }
}

impl ApduCommand for GetStatusCommand {
    type Success = IssuerSecurityDomainStatus;
    type Error = Error;

    fn name(&self) -> &'static str {
        "GET STATUS"
    }

    fn command(&self) -> Command {
        Command::new(
            cla::GP,
            ins::GET_STATUS,
            get_status::ISSUER_SECURITY_DOMAIN,
            get_status::TLV_DATA,
        )
        .with_data(vec![tags::AID, 0x00])
        .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<IssuerSecurityDomainStatus> {
        let data = response.check(self.name())?;
        parse_isd_entry(&data)
    }
}

fn parse_isd_entry(data: &[u8]) -> Result<IssuerSecurityDomainStatus> {
    let entry = Tlv::from_bytes(data)?;
    if entry.tag().to_bytes() != [tags::GET_STATUS_ENTRY] {
        return Err(Error::InvalidData("missing GET STATUS entry template"));
    }
    let Value::Constructed(fields) = entry.value() else {
        return Err(Error::InvalidData("GET STATUS entry is not constructed"));
    };

    let mut aid = None;
    let mut life_cycle = None;
    let mut privileges = None;

    for field in fields {
        let Value::Primitive(value) = field.value() else {
            continue;
        };
        match field.tag().to_bytes() {
            [tags::AID] => aid = Some(Bytes::copy_from_slice(value)),
            t if t == tags::LIFE_CYCLE => life_cycle = value.first().copied(),
            [tags::PRIVILEGES] => privileges = Some(Bytes::copy_from_slice(value)),
            _ => {}
        }
    }

    Ok(IssuerSecurityDomainStatus {
        aid: aid.ok_or(Error::InvalidData("missing AID"))?,
        life_cycle: life_cycle.ok_or(Error::InvalidData("missing life cycle state"))?,
        privileges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_get_status_encoding() {
        let cmd = GetStatusCommand::issuer_security_domain().command();
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80F28002024F0000"));
    }

    #[test]
    fn test_parse_isd_entry() {
        let response = Response::new(
            hex!("E3134F08A0000001510000009F70010FC5039EFE80").to_vec(),
            0x9000,
        );
        let status = GetStatusCommand.parse_response(response).unwrap();
        assert_eq!(status.aid.as_ref(), hex!("A000000151000000"));
        assert_eq!(status.life_cycle, 0x0F);
        assert_eq!(status.privileges.as_deref(), Some(&hex!("9EFE80")[..]));
    }

    #[test]
    fn test_parse_rejects_other_template() {
        let response = Response::new(hex!("E1024F00").to_vec(), 0x9000);
        assert!(GetStatusCommand.parse_response(response).is_err());
    }
}
