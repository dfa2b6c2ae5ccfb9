//! SCP02 secure channel
//!
//! [`GPSecureChannel`] decorates another [`Channel`]: every command is given
//! a C-MAC chained from the previous one. Responses are not protected at the
//! C-MAC security level and pass through unchanged.

use std::fmt;

use bytes::{BufMut, BytesMut};
use cipher::{Iv, Key};
use nexum_keycard_apdu::{Channel, Command, RandomSource, Response};
use tracing::{debug, trace};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    Result,
    commands::ExternalAuthenticateCommand,
    constants::cla,
    crypto::{Scp02, Scp02Mac, encrypt_icv, mac_full_3des},
    session::{Scp02Keys, Session},
};

const MAC_LEN: usize = 8;

/// C-MAC state of one session
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Scp02Wrapper {
    mac_key: [u8; 16],
    last_mac: Option<Scp02Mac>,
}

impl Scp02Wrapper {
    /// Start a chain under the session MAC key
    pub fn new(mac_key: &Key<Scp02>) -> Self {
        Self {
            mac_key: (*mac_key).into(),
            last_mac: None,
        }
    }

    /// Append the C-MAC to `command`
    ///
    /// The chaining value is zero for the first command and the previous MAC
    /// encrypted under K1 afterwards. The chain only advances when a command
    /// is actually produced.
    pub fn wrap(&mut self, command: &Command) -> nexum_keycard_apdu::Result<Command> {
        let data = command.data();
        if data.len() + MAC_LEN > nexum_keycard_apdu::command::MAX_DATA_LENGTH {
            return Err(nexum_keycard_apdu::Error::InvalidCommand(
                "command data too long for C-MAC",
            ));
        }

        let cla = command.cla | cla::SECURE_MESSAGING;
        let mut mac_input = BytesMut::with_capacity(5 + data.len());
        mac_input.put_slice(&[cla, command.ins, command.p1, command.p2]);
        mac_input.put_u8((data.len() + MAC_LEN) as u8);
        mac_input.put_slice(data);

        let key = Key::<Scp02>::from_slice(&self.mac_key);
        let icv = match &self.last_mac {
            Some(mac) => encrypt_icv(key, Iv::<Scp02>::from_slice(mac)),
            None => Iv::<Scp02>::default(),
        };
        let mac = mac_full_3des(key, &icv, &mac_input);
        self.last_mac = Some(mac);

        let mut wrapped = BytesMut::with_capacity(data.len() + MAC_LEN);
        wrapped.put_slice(data);
        wrapped.put_slice(&mac);

        let mut out = Command::new(cla, command.ins, command.p1, command.p2).with_data(wrapped.freeze());
        out.le = command.le;
        Ok(out)
    }

    /// MAC of the last wrapped command
    pub const fn last_mac(&self) -> Option<&Scp02Mac> {
        self.last_mac.as_ref()
    }
}

impl fmt::Debug for Scp02Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scp02Wrapper")
            .field("chained", &self.last_mac.is_some())
            .finish_non_exhaustive()
    }
}

/// Channel to the card manager protected by SCP02 C-MAC
#[derive(Debug)]
pub struct GPSecureChannel<C: Channel> {
    inner: C,
    session: Session,
    wrapper: Scp02Wrapper,
}

impl<C: Channel> GPSecureChannel<C> {
    /// Decorate `inner` with an already initialized session
    ///
    /// The channel is not usable until [`authenticate`](Self::authenticate)
    /// succeeds.
    pub fn new(inner: C, session: Session) -> Self {
        let wrapper = Scp02Wrapper::new(session.mac_key());
        Self {
            inner,
            session,
            wrapper,
        }
    }

    /// Run the full handshake: INITIALIZE UPDATE, then EXTERNAL AUTHENTICATE
    pub fn open(mut inner: C, keys: &Scp02Keys, rng: &mut dyn RandomSource) -> Result<Self> {
        let session = Session::initialize(&mut inner, keys, rng)?;
        let mut channel = Self::new(inner, session);
        channel.authenticate()?;
        Ok(channel)
    }

    /// Send EXTERNAL AUTHENTICATE with the host cryptogram
    pub fn authenticate(&mut self) -> Result<()> {
        let command = ExternalAuthenticateCommand::new(self.session.host_cryptogram());
        self.execute(&command)?;
        debug!("SCP02 secure channel established");
        Ok(())
    }

    /// Session in use
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Drop the session and give back the wrapped channel
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Channel> Channel for GPSecureChannel<C> {
    fn send(&mut self, command: &Command) -> nexum_keycard_apdu::Result<Response> {
        let wrapped = self.wrapper.wrap(command)?;
        trace!(ins = command.ins, "command wrapped with C-MAC");
        self.inner.send(&wrapped)
    }
}
