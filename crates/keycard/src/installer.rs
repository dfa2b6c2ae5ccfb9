//! Applet provisioning through the card manager
//!
//! [`Installer`] wipes any previous Keycard package from the card, streams a
//! new load file and installs the Keycard, cash and (optionally) NDEF applet
//! instances. CAP file parsing happens elsewhere: the installer takes the
//! already concatenated load file.

use alloy_primitives::hex;
use nexum_keycard_apdu::{CardTransport, Channel, PlainChannel};
use nexum_keycard_globalplatform::{DeleteOutcome, GlobalPlatform, LoadFileStream, Scp02Keys};
use tracing::{debug, info};

use crate::{
    Error, Result,
    commands::SelectCommand,
    constants::{
        CASH_AID, CASH_INSTANCE_AID, DEFAULT_INSTANCE_INDEX, KEYCARD_AID, NDEF_AID,
        NDEF_INSTANCE_AID, PACKAGE_AID, keycard_instance_aid,
    },
    types::ApplicationInfo,
};

/// Installs and removes the Keycard package
#[derive(Debug)]
pub struct Installer<T: CardTransport> {
    transport: T,
    keys: Scp02Keys,
    overwrite: bool,
    ndef_record: Option<Vec<u8>>,
}

impl<T: CardTransport> Installer<T> {
    /// Installer using the development card manager keys
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            keys: Scp02Keys::default(),
            overwrite: false,
            ndef_record: None,
        }
    }

    /// Card specific card manager keys
    pub fn with_keys(mut self, keys: Scp02Keys) -> Self {
        self.keys = keys;
        self
    }

    /// Replace an applet that is already installed instead of failing
    pub const fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Also install the NDEF applet with this record
    pub fn with_ndef_record(mut self, record: impl Into<Vec<u8>>) -> Self {
        self.ndef_record = Some(record.into());
        self
    }

    /// Install the package in `load_file`
    ///
    /// `progress(loaded, total)` is called after every LOAD block.
    pub fn install(&mut self, load_file: &[u8], progress: impl FnMut(usize, usize)) -> Result<()> {
        info!("installation started");
        if self.info()?.installed && !self.overwrite {
            return Err(Error::AppletAlreadyInstalled);
        }

        let ndef_record = self.ndef_record.clone();
        let mut gp = self.card_manager()?;
        delete_package(&mut gp)?;

        info!("loading package");
        gp.install_for_load(PACKAGE_AID, &[])?;
        gp.load(LoadFileStream::new(load_file), progress)?;

        info!("installing keycard applet");
        gp.install_for_install(
            PACKAGE_AID,
            KEYCARD_AID,
            &keycard_instance_aid(DEFAULT_INSTANCE_INDEX),
            &[],
        )?;

        info!("installing cash applet");
        gp.install_for_install(PACKAGE_AID, CASH_AID, CASH_INSTANCE_AID, &[])?;

        if let Some(record) = &ndef_record {
            info!("installing NDEF applet");
            gp.install_for_install(PACKAGE_AID, NDEF_AID, NDEF_INSTANCE_AID, record)?;
        }

        info!("installation completed");
        Ok(())
    }

    /// Delete every applet instance and the package
    pub fn delete(&mut self) -> Result<()> {
        let mut gp = self.card_manager()?;
        delete_package(&mut gp)
    }

    /// Select the keycard applet and report what it says about itself
    pub fn info(&mut self) -> Result<ApplicationInfo> {
        PlainChannel::new(&mut self.transport).execute(&SelectCommand::with_aid(
            keycard_instance_aid(DEFAULT_INSTANCE_INDEX),
        ))
    }

    /// Give back the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn card_manager(&mut self) -> Result<GlobalPlatform<&mut T>> {
        let mut gp = GlobalPlatform::with_keys(&mut self.transport, self.keys.clone());
        gp.select()?;
        gp.open_secure_channel()?;
        Ok(gp)
    }
}

fn delete_package<T: CardTransport>(gp: &mut GlobalPlatform<T>) -> Result<()> {
    for aid in [
        NDEF_INSTANCE_AID.to_vec(),
        keycard_instance_aid(DEFAULT_INSTANCE_INDEX),
        CASH_INSTANCE_AID.to_vec(),
    ] {
        let outcome = gp.delete(&aid)?;
        debug!(aid = %hex::encode(&aid), %outcome, "instance");
    }

    if gp.delete_object_and_related(PACKAGE_AID)? == DeleteOutcome::NotFound {
        debug!("no previous package");
    }
    Ok(())
}
