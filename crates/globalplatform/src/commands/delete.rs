use bytes::{BufMut, BytesMut};
use derive_more::Display;
use nexum_keycard_apdu::{ApduCommand, Command, Response, status};

use crate::constants::{cla, delete_p2, ins, tags};
use crate::{Error, Result};

/// What DELETE did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DeleteOutcome {
    /// The object existed and was removed
    #[display("deleted")]
    Deleted,
    /// The card reported `6A88`
    #[display("not found")]
    NotFound,
}

/// DELETE an object by AID
#[derive(Debug, Clone)]
pub struct DeleteCommand {
    aid: Vec<u8>,
    p2: u8,
}

impl DeleteCommand {
    /// Delete the object only
    pub fn object(aid: impl AsRef<[u8]>) -> Self {
        Self {
            aid: aid.as_ref().to_vec(),
            p2: delete_p2::OBJECT,
        }
    }

    /// Delete the object and related objects (a package and its instances)
    pub fn object_and_related(aid: impl AsRef<[u8]>) -> Self {
        Self {
            aid: aid.as_ref().to_vec(),
            p2: delete_p2::OBJECT_AND_RELATED,
        }
    }
}

impl ApduCommand for DeleteCommand {
    type Success = DeleteOutcome;
    type Error = Error;

    fn name(&self) -> &'static str {
        "DELETE"
    }

    fn command(&self) -> Command {
        let mut data = BytesMut::with_capacity(2 + self.aid.len());
        data.put_u8(tags::AID);
        data.put_u8(self.aid.len() as u8);
        data.put_slice(&self.aid);

        Command::new(cla::GP, ins::DELETE, 0x00, self.p2)
            .with_data(data.freeze())
            .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<DeleteOutcome> {
        match response.status() {
            status::SW_REFERENCED_DATA_NOT_FOUND => Ok(DeleteOutcome::NotFound),
            _ => {
                response.check(self.name())?;
                Ok(DeleteOutcome::Deleted)
            }
        }
    }
}
