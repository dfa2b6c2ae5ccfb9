use bytes::Bytes;
use nexum_keycard_apdu::{ApduCommand, Command, Response, status};

use crate::constants::{cla, ins, select_p1};
use crate::{Error, Result};

/// SELECT by AID
///
/// `9000` yields the FCI; `6A88` is accepted when the command was built with
/// [`SelectCommand::allow_not_found`] and yields empty data.
#[derive(Debug, Clone)]
pub struct SelectCommand {
    aid: Bytes,
    allow_not_found: bool,
}

impl SelectCommand {
    /// Select the application identified by `aid`
    pub fn with_aid(aid: impl AsRef<[u8]>) -> Self {
        Self {
            aid: Bytes::copy_from_slice(aid.as_ref()),
            allow_not_found: false,
        }
    }

    /// Accept `6A88` as a non-fatal answer
    pub const fn allow_not_found(mut self) -> Self {
        self.allow_not_found = true;
        self
    }
}

impl ApduCommand for SelectCommand {
    type Success = Bytes;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SELECT"
    }

    fn command(&self) -> Command {
        Command::new(cla::ISO7816, ins::SELECT, select_p1::BY_NAME, 0x00)
            .with_data(self.aid.clone())
            .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<Bytes> {
        if self.allow_not_found && response.status() == status::SW_REFERENCED_DATA_NOT_FOUND {
            return Ok(Bytes::new());
        }
        Ok(response.check(self.name())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CARD_MANAGER_AID;
    use hex_literal::hex;

    #[test]
    fn test_select_encoding() {
        let cmd = SelectCommand::with_aid(CARD_MANAGER_AID).command();
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00A4040008A00000015100000000"));
    }

    #[test]
    fn test_select_status_handling() {
        let cmd = SelectCommand::with_aid(CARD_MANAGER_AID);
        let err = cmd
            .parse_response(Response::status_only(status::SW_REFERENCED_DATA_NOT_FOUND))
            .unwrap_err();
        assert_eq!(err.status(), Some(status::SW_REFERENCED_DATA_NOT_FOUND));

        let fci = cmd
            .clone()
            .allow_not_found()
            .parse_response(Response::status_only(status::SW_REFERENCED_DATA_NOT_FOUND))
            .unwrap();
        assert!(fci.is_empty());

        let err = cmd
            .allow_not_found()
            .parse_response(Response::status_only(status::SW_FILE_NOT_FOUND))
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse { operation: "SELECT", .. }));
    }
}
