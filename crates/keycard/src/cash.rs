//! Cash applet
//!
//! A second applet in the Keycard package holding a single key that signs
//! without PIN or secure channel, for low-value payments.

use nexum_keycard_apdu::{ApduCommand, CardTransport, Channel, Command, PlainChannel, Response};
use tracing::debug;

use crate::{
    Error, Result,
    constants::{CASH_INSTANCE_AID, CLA_GP, ins},
    types::{CashApplicationInfo, Signature},
};

struct CashSelectCommand;

impl ApduCommand for CashSelectCommand {
    type Success = CashApplicationInfo;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SELECT"
    }

    fn command(&self) -> Command {
        Command::new(0x00, 0xA4, 0x04, 0x00)
            .with_data(CASH_INSTANCE_AID)
            .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<CashApplicationInfo> {
        let data = response.check(self.name())?;
        CashApplicationInfo::from_select_response(&data)
    }
}

struct CashSignCommand {
    hash: [u8; 32],
}

impl ApduCommand for CashSignCommand {
    type Success = Signature;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SIGN"
    }

    fn command(&self) -> Command {
        Command::new(CLA_GP, ins::SIGN, 0x00, 0x00)
            .with_data(self.hash.to_vec())
            .with_le(0)
    }

    fn parse_response(&self, response: Response) -> Result<Signature> {
        let data = response.check(self.name())?;
        Signature::from_response(&self.hash, &data)
    }
}

/// Cash applet session over a transport
#[derive(Debug)]
pub struct CashCommandSet<T: CardTransport> {
    channel: PlainChannel<T>,
    info: Option<CashApplicationInfo>,
}

impl<T: CardTransport> CashCommandSet<T> {
    /// Cash applet session over `transport`; call [`select`](Self::select) first
    pub const fn new(transport: T) -> Self {
        Self {
            channel: PlainChannel::new(transport),
            info: None,
        }
    }

    /// Select the cash applet
    pub fn select(&mut self) -> Result<CashApplicationInfo> {
        let info = self.channel.execute(&CashSelectCommand)?;
        debug!(version = %info.version, "cash applet selected");
        self.info = Some(info.clone());
        Ok(info)
    }

    /// Snapshot from the last SELECT
    pub const fn info(&self) -> Option<&CashApplicationInfo> {
        self.info.as_ref()
    }

    /// Sign a 32-byte hash
    pub fn sign(&mut self, hash: &[u8]) -> Result<Signature> {
        let hash = hash
            .try_into()
            .map_err(|_| Error::InvalidHashLength(hash.len()))?;
        if self.info.is_none() {
            return Err(Error::NotSelected);
        }
        self.channel.execute(&CashSignCommand { hash })
    }

    /// Give back the transport
    pub fn into_transport(self) -> T {
        self.channel.into_inner()
    }
}
