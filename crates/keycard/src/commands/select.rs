use bytes::Bytes;
use nexum_keycard_apdu::{ApduCommand, Command, Response, status};

use crate::{Error, Result, types::ApplicationInfo};

/// SELECT the Keycard applet
///
/// `6A82` is reported as an applet that is not installed rather than an
/// error.
#[derive(Debug, Clone)]
pub struct SelectCommand {
    aid: Bytes,
}

impl SelectCommand {
    /// Select the applet instance identified by `aid`
    pub fn with_aid(aid: impl AsRef<[u8]>) -> Self {
        Self {
            aid: Bytes::copy_from_slice(aid.as_ref()),
        }
    }
}

impl ApduCommand for SelectCommand {
    type Success = ApplicationInfo;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SELECT"
    }

    fn command(&self) -> Command {
        Command::new(0x00, 0xA4, 0x04, 0x00)
            .with_data(self.aid.clone())
            .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<ApplicationInfo> {
        if response.status() == status::SW_FILE_NOT_FOUND {
            return Ok(ApplicationInfo::not_installed());
        }
        let data = response.check(self.name())?;
        ApplicationInfo::from_select_response(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::keycard_instance_aid;
    use hex_literal::hex;

    #[test]
    fn test_select_encoding() {
        let cmd = SelectCommand::with_aid(keycard_instance_aid(1)).command();
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00A4040009A0000008040001010100"));
    }

    #[test]
    fn test_select_not_installed() {
        let cmd = SelectCommand::with_aid(keycard_instance_aid(1));
        let info = cmd
            .parse_response(Response::status_only(status::SW_FILE_NOT_FOUND))
            .unwrap();
        assert!(!info.installed);
        assert!(!info.initialized);

        let err = cmd
            .parse_response(Response::status_only(status::SW_CONDITIONS_NOT_SATISFIED))
            .unwrap_err();
        assert_eq!(err.status(), Some(status::SW_CONDITIONS_NOT_SATISFIED));
    }
}
