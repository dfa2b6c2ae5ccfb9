//! Raw byte exchange with a card

use std::fmt;

use bytes::Bytes;
use tracing::trace;

/// Errors reported by a transport implementation
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No card or reader connected
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The exchange did not complete
    #[error("Transmission failed: {0}")]
    Transmission(String),

    /// The card did not answer in time
    #[error("Timeout waiting for card response")]
    Timeout,

    /// Any other device failure
    #[error("Device error: {0}")]
    Device(String),
}

/// Synchronous, single in-flight byte exchange with a card
///
/// Implementations live outside this workspace (PC/SC, NFC readers, test
/// doubles). Timeouts are the implementation's concern and are reported as
/// [`TransportError::Timeout`].
pub trait CardTransport: fmt::Debug {
    /// Send a command APDU and wait for the response bytes
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(command = %hex::encode(command), "transmit");
        let response = self.do_transmit_raw(command)?;
        trace!(response = %hex::encode(&response), "received");
        Ok(response)
    }

    /// Implementation of the raw exchange
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Whether a card is currently reachable
    fn is_connected(&self) -> bool {
        true
    }

    /// Reset the card connection, dropping any card-side session
    fn reset(&mut self) -> Result<(), TransportError>;
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        (**self).do_transmit_raw(command)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }
}

impl<T: CardTransport + ?Sized> CardTransport for Box<T> {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        (**self).do_transmit_raw(command)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }
}
