//! APDU command encoding

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Maximum number of data bytes in a short APDU
pub const MAX_DATA_LENGTH: usize = 255;

/// ISO/IEC 7816-4 command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<u8>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Command data, empty when absent
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Check that the command fits a short APDU
    pub fn validate(&self) -> Result<()> {
        if self.data().len() > MAX_DATA_LENGTH {
            return Err(Error::InvalidCommand("command data exceeds 255 bytes"));
        }
        Ok(())
    }

    /// Encode as `CLA INS P1 P2 [LC DATA] [LE]`
    pub fn to_bytes(&self) -> Bytes {
        let data = self.data();
        let mut buf = BytesMut::with_capacity(6 + data.len());
        buf.put_slice(&[self.cla, self.ins, self.p1, self.p2]);

        if !data.is_empty() {
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }

        if let Some(le) = self.le {
            buf.put_u8(le);
        }

        buf.freeze()
    }

    /// Decode a short APDU
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let [cla, ins, p1, p2, body @ ..] = bytes else {
            return Err(Error::InvalidCommand("command shorter than header"));
        };
        let command = Self::new(*cla, *ins, *p1, *p2);

        match body {
            [] => Ok(command),
            [le] => Ok(command.with_le(*le)),
            [lc, rest @ ..] => {
                let lc = *lc as usize;
                match rest.len() {
                    n if n == lc => Ok(command.with_data(Bytes::copy_from_slice(rest))),
                    n if n == lc + 1 => Ok(command
                        .with_data(Bytes::copy_from_slice(&rest[..lc]))
                        .with_le(rest[lc])),
                    _ => Err(Error::InvalidCommand("Lc does not match data length")),
                }
            }
        }
    }
}
