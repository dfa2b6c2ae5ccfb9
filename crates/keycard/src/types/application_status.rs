use std::fmt;

use super::{children, parse_template, primitive};
use crate::{Error, Result, constants::tags};

/// Application status returned by GET STATUS with P1=0x00
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationStatus {
    /// PIN retry count
    pub pin_retry_count: u8,
    /// PUK retry count
    pub puk_retry_count: u8,
    /// Key initialized flag
    pub key_initialized: bool,
}

impl TryFrom<&[u8]> for ApplicationStatus {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        let tlv = parse_template(data, tags::TEMPLATE_APPLICATION_STATUS)?;
        let [pin, puk, key_initialized, ..] = children(&tlv)? else {
            return Err(Error::InvalidData("incomplete application status"));
        };

        let first = |bytes: &[u8]| {
            bytes
                .first()
                .copied()
                .ok_or(Error::InvalidData("empty application status field"))
        };

        Ok(Self {
            pin_retry_count: first(primitive(pin, tags::OTHER)?)?,
            puk_retry_count: first(primitive(puk, tags::OTHER)?)?,
            key_initialized: first(primitive(key_initialized, tags::KEY_INITIALIZED)?)? == 0xFF,
        })
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application Status:")?;
        writeln!(f, "  PIN retries remaining: {}", self.pin_retry_count)?;
        writeln!(f, "  PUK retries remaining: {}", self.puk_retry_count)?;
        write!(f, "  Key initialized: {}", self.key_initialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_parse_status() {
        let status = ApplicationStatus::try_from(hex!("A309020103020105010100").as_slice()).unwrap();
        assert_eq!(
            status,
            ApplicationStatus {
                pin_retry_count: 3,
                puk_retry_count: 5,
                key_initialized: false,
            }
        );

        let status = ApplicationStatus::try_from(hex!("A3090201020201050101FF").as_slice()).unwrap();
        assert_eq!(status.pin_retry_count, 2);
        assert!(status.key_initialized);
    }

    #[test]
    fn test_parse_status_rejects_short_template() {
        assert!(ApplicationStatus::try_from(hex!("A30302010A").as_slice()).is_err());
        assert!(ApplicationStatus::try_from(hex!("A403020103").as_slice()).is_err());
    }
}
