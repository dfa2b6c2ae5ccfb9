//! Command channels
//!
//! A [`Channel`] turns a [`Command`] into a [`Response`]. The plain channel
//! talks to the transport directly; secure channels in the card-manager and
//! applet crates wrap another channel and protect every message passing
//! through them.

use std::fmt;

use tracing::debug;

use crate::{CardTransport, Command, Error, Response, Result};

/// A typed command: how to build it and how to read the card's answer
pub trait ApduCommand {
    /// Parsed result of a successful exchange
    type Success;
    /// Error produced when parsing fails or the card refuses
    type Error: From<Error>;

    /// Operation name used in logs and error reports
    fn name(&self) -> &'static str;

    /// Build the command APDU
    fn command(&self) -> Command;

    /// Interpret the card's response
    fn parse_response(&self, response: Response) -> std::result::Result<Self::Success, Self::Error>;
}

/// Something that can exchange a command for a response
pub trait Channel: fmt::Debug {
    /// Send one command and wait for its response
    fn send(&mut self, command: &Command) -> Result<Response>;

    /// Send a typed command and parse its response
    fn execute<A: ApduCommand>(&mut self, apdu: &A) -> std::result::Result<A::Success, A::Error>
    where
        Self: Sized,
    {
        let command = apdu.command();
        debug!(command = apdu.name(), "executing");

        let response = self.send(&command)?;
        if !response.is_success() {
            debug!(command = apdu.name(), sw = %response.status(), "card returned error status");
        }

        apdu.parse_response(response)
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send(&mut self, command: &Command) -> Result<Response> {
        (**self).send(command)
    }
}

/// Pass-through channel over a transport
#[derive(Debug)]
pub struct PlainChannel<T: CardTransport> {
    transport: T,
}

impl<T: CardTransport> PlainChannel<T> {
    /// Wrap a transport
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Borrow the transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the transport
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: CardTransport> Channel for PlainChannel<T> {
    fn send(&mut self, command: &Command) -> Result<Response> {
        command.validate()?;
        let response = self.transport.transmit_raw(&command.to_bytes())?;
        Response::from_bytes(&response)
    }
}

impl<T: CardTransport> From<T> for PlainChannel<T> {
    fn from(transport: T) -> Self {
        Self::new(transport)
    }
}
