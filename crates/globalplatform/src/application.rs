//! Card manager command set
//!
//! [`GlobalPlatform`] owns the transport and walks the card manager through
//! select, SCP02 authentication and the package lifecycle commands. Lifecycle
//! commands are only sent over an authenticated secure channel.

use std::mem;

use bytes::Bytes;
use nexum_keycard_apdu::{
    CardTransport, Channel, Command, PlainChannel, RandomSource, Response, SystemRandom,
    TransportError,
};
use tracing::{debug, info};

use crate::{
    Error, Result,
    commands::{
        DeleteCommand, DeleteOutcome, GetStatusCommand, InstallCommand, IssuerSecurityDomainStatus,
        SelectCommand,
    },
    constants::CARD_MANAGER_AID,
    load::LoadFileStream,
    secure_channel::GPSecureChannel,
    session::{Scp02Keys, Session},
};

#[derive(Debug)]
enum Link<T: CardTransport> {
    Plain(PlainChannel<T>),
    Secure(GPSecureChannel<PlainChannel<T>>),
    // only observable while a handshake is in flight
    Detached,
}

impl<T: CardTransport> Link<T> {
    fn into_plain(self) -> Option<PlainChannel<T>> {
        match self {
            Self::Plain(channel) => Some(channel),
            Self::Secure(channel) => Some(channel.into_inner()),
            Self::Detached => None,
        }
    }
}

impl<T: CardTransport> Channel for Link<T> {
    fn send(&mut self, command: &Command) -> nexum_keycard_apdu::Result<Response> {
        match self {
            Self::Plain(channel) => channel.send(command),
            Self::Secure(channel) => channel.send(command),
            Self::Detached => Err(TransportError::Connection("channel detached".into()).into()),
        }
    }
}

/// Card manager session over a transport
#[derive(Debug)]
pub struct GlobalPlatform<T: CardTransport> {
    link: Link<T>,
    keys: Scp02Keys,
    rng: Box<dyn RandomSource>,
    selected: bool,
}

impl<T: CardTransport> GlobalPlatform<T> {
    /// Talk to the card manager with the development keys
    pub fn new(transport: T) -> Self {
        Self::with_keys(transport, Scp02Keys::default())
    }

    /// Talk to the card manager with card specific keys
    pub fn with_keys(transport: T, keys: Scp02Keys) -> Self {
        Self::with_random(transport, keys, SystemRandom)
    }

    /// Use `rng` for host challenges
    pub fn with_random(transport: T, keys: Scp02Keys, rng: impl RandomSource + 'static) -> Self {
        Self {
            link: Link::Plain(PlainChannel::new(transport)),
            keys,
            rng: Box::new(rng),
            selected: false,
        }
    }

    /// Select the card manager
    ///
    /// `6A88` is accepted as well as `9000`. Any open secure channel is
    /// dropped.
    pub fn select(&mut self) -> Result<Bytes> {
        self.drop_secure_channel();
        let fci = self
            .link
            .execute(&SelectCommand::with_aid(CARD_MANAGER_AID).allow_not_found())?;
        self.selected = true;
        debug!("card manager selected");
        Ok(fci)
    }

    /// Select any application by AID
    ///
    /// The card manager is no longer considered selected afterwards.
    pub fn select_aid(&mut self, aid: &[u8]) -> Result<Bytes> {
        self.drop_secure_channel();
        self.selected = false;
        self.link.execute(&SelectCommand::with_aid(aid))
    }

    /// Authenticate to the card manager with SCP02
    ///
    /// On failure the channel falls back to plain and the session is discarded.
    pub fn open_secure_channel(&mut self) -> Result<()> {
        if !self.selected {
            return Err(Error::NotSelected);
        }

        let mut plain = mem::replace(&mut self.link, Link::Detached)
            .into_plain()
            .ok_or_else(|| {
                nexum_keycard_apdu::Error::from(TransportError::Connection(
                    "channel detached".into(),
                ))
            })?;

        let session = match Session::initialize(&mut plain, &self.keys, &mut *self.rng) {
            Ok(session) => session,
            Err(e) => {
                self.link = Link::Plain(plain);
                return Err(e);
            }
        };

        let mut secure = GPSecureChannel::new(plain, session);
        match secure.authenticate() {
            Ok(()) => {
                self.link = Link::Secure(secure);
                Ok(())
            }
            Err(e) => {
                self.link = Link::Plain(secure.into_inner());
                Err(e)
            }
        }
    }

    /// Delete an object, tolerating `6A88`
    pub fn delete(&mut self, aid: &[u8]) -> Result<DeleteOutcome> {
        let outcome = self.secure()?.execute(&DeleteCommand::object(aid))?;
        debug!(%outcome, "delete");
        Ok(outcome)
    }

    /// Delete an object and everything depending on it, tolerating `6A88`
    pub fn delete_object_and_related(&mut self, aid: &[u8]) -> Result<DeleteOutcome> {
        let outcome = self
            .secure()?
            .execute(&DeleteCommand::object_and_related(aid))?;
        debug!(%outcome, "delete object and related");
        Ok(outcome)
    }

    /// INSTALL [for load]
    pub fn install_for_load(&mut self, package_aid: &[u8], security_domain_aid: &[u8]) -> Result<()> {
        self.secure()?
            .execute(&InstallCommand::for_load(package_aid, security_domain_aid))
    }

    /// Stream a load file, calling `progress(loaded, total)` after each block
    pub fn load(
        &mut self,
        stream: LoadFileStream,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<()> {
        let channel = self.secure()?;
        let total = stream.block_count();

        for (n, block) in stream.enumerate() {
            channel.execute(&block)?;
            progress(n + 1, total);
        }

        info!(blocks = total, "load file transferred");
        Ok(())
    }

    /// INSTALL [for install and make selectable]
    pub fn install_for_install(
        &mut self,
        package_aid: &[u8],
        applet_aid: &[u8],
        instance_aid: &[u8],
        params: &[u8],
    ) -> Result<()> {
        self.secure()?.execute(&InstallCommand::for_install(
            package_aid,
            applet_aid,
            instance_aid,
            params,
        ))
    }

    /// Lifecycle state of the issuer security domain
    pub fn get_status_isd(&mut self) -> Result<IssuerSecurityDomainStatus> {
        self.secure()?
            .execute(&GetStatusCommand::issuer_security_domain())
    }

    /// Whether the card manager is selected
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Current SCP02 session, if authenticated
    pub const fn session(&self) -> Option<&Session> {
        match &self.link {
            Link::Secure(channel) => Some(channel.session()),
            _ => None,
        }
    }

    /// Release the transport
    ///
    /// Returns `None` only if a handshake was interrupted by a panic.
    pub fn into_transport(self) -> Option<T> {
        self.link.into_plain().map(PlainChannel::into_inner)
    }

    fn secure(&mut self) -> Result<&mut GPSecureChannel<PlainChannel<T>>> {
        match &mut self.link {
            Link::Secure(channel) => Ok(channel),
            _ => Err(Error::SecureChannelRequired),
        }
    }

    fn drop_secure_channel(&mut self) {
        if matches!(self.link, Link::Secure(_)) {
            let link = mem::replace(&mut self.link, Link::Detached);
            self.link = link.into_plain().map_or(Link::Detached, Link::Plain);
        }
    }
}
