use derive_more::{Display, From, Into};

use crate::{Error, Result};

/// Application version (major.minor)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Display, From, Into)]
#[display("{}.{}", major, minor)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl TryFrom<&[u8]> for Version {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [major, minor] => Ok(Self {
                major: *major,
                minor: *minor,
            }),
            _ => Err(Error::InvalidData("version must be two bytes")),
        }
    }
}

impl From<Version> for u16 {
    fn from(version: Version) -> Self {
        u16::from_be_bytes([version.major, version.minor])
    }
}
