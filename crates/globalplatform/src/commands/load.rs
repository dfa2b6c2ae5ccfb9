use bytes::Bytes;
use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::constants::{cla, ins, load_p1};
use crate::{Error, Result};

/// One LOAD block
#[derive(Debug, Clone)]
pub struct LoadCommand {
    last: bool,
    index: u8,
    block: Bytes,
}

impl LoadCommand {
    /// Block number `index`; `last` marks the final block
    pub const fn new(last: bool, index: u8, block: Bytes) -> Self {
        Self { last, index, block }
    }

    /// Whether this is the final block
    pub const fn is_last(&self) -> bool {
        self.last
    }

    /// Block number
    pub const fn index(&self) -> u8 {
        self.index
    }
}

impl ApduCommand for LoadCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "LOAD"
    }

    fn command(&self) -> Command {
        let p1 = if self.last {
            load_p1::LAST_BLOCK
        } else {
            load_p1::MORE_BLOCKS
        };
        Command::new(cla::GP, ins::LOAD, p1, self.index).with_data(self.block.clone())
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        response.check(self.name())?;
        Ok(())
    }
}
