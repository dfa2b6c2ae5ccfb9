//! APDU response decoding

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result, StatusWord};

/// ISO/IEC 7816-4 response APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    data: Bytes,
    status: StatusWord,
}

impl Response {
    /// Create a response from its parts
    pub fn new(data: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            data: data.into(),
            status: status.into(),
        }
    }

    /// Response carrying only a status word
    pub const fn status_only(status: StatusWord) -> Self {
        Self {
            data: Bytes::new(),
            status,
        }
    }

    /// Split `DATA ‖ SW1 SW2`; anything shorter than two bytes is malformed
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let [data @ .., sw1, sw2] = bytes else {
            return Err(Error::MalformedResponse { len: bytes.len() });
        };

        Ok(Self {
            data: Bytes::copy_from_slice(data),
            status: StatusWord::new(*sw1, *sw2),
        })
    }

    /// Encode as the card would send it
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.data.len() + 2);
        buf.put_slice(&self.data);
        buf.put_u8(self.status.sw1);
        buf.put_u8(self.status.sw2);
        buf.freeze()
    }

    /// Response data without the status word
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the response data
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Whether the status word is `9000`
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Return the data on success, or an `UnexpectedResponse` naming `operation`
    pub fn check(self, operation: &'static str) -> Result<Bytes> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(Error::UnexpectedResponse {
                operation,
                status: self.status,
            })
        }
    }
}
