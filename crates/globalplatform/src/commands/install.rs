use bytes::{BufMut, Bytes, BytesMut};
use nexum_keycard_apdu::{ApduCommand, Command, Response};

use crate::constants::{cla, ins, install_p1, tags};
use crate::{Error, Result};

/// INSTALL [for load] and INSTALL [for install and make selectable]
#[derive(Debug, Clone)]
pub struct InstallCommand {
    p1: u8,
    data: Bytes,
}

impl InstallCommand {
    /// Prepare loading of `package_aid` associated with `security_domain_aid`
    pub fn for_load(package_aid: &[u8], security_domain_aid: &[u8]) -> Self {
        let mut data = BytesMut::with_capacity(5 + package_aid.len() + security_domain_aid.len());
        put_lv(&mut data, package_aid);
        put_lv(&mut data, security_domain_aid);
        // data authentication pattern, load parameters, load token
        data.put_slice(&[0x00, 0x00, 0x00]);

        Self {
            p1: install_p1::FOR_LOAD,
            data: data.freeze(),
        }
    }

    /// Instantiate `applet_aid` from `package_aid` as `instance_aid`
    ///
    /// `params` are wrapped in a `C9` TLV; privileges are left empty (`00`).
    pub fn for_install(
        package_aid: &[u8],
        applet_aid: &[u8],
        instance_aid: &[u8],
        params: &[u8],
    ) -> Self {
        let mut data = BytesMut::new();
        put_lv(&mut data, package_aid);
        put_lv(&mut data, applet_aid);
        put_lv(&mut data, instance_aid);
        put_lv(&mut data, &[0x00]);

        let mut install_params = BytesMut::with_capacity(2 + params.len());
        install_params.put_u8(tags::INSTALL_PARAMETERS);
        install_params.put_u8(params.len() as u8);
        install_params.put_slice(params);
        put_lv(&mut data, &install_params);

        // install token
        data.put_u8(0x00);

        Self {
            p1: install_p1::FOR_INSTALL_AND_MAKE_SELECTABLE,
            data: data.freeze(),
        }
    }
}

fn put_lv(buf: &mut BytesMut, value: &[u8]) {
    buf.put_u8(value.len() as u8);
    buf.put_slice(value);
}

impl ApduCommand for InstallCommand {
    type Success = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        match self.p1 {
            install_p1::FOR_LOAD => "INSTALL [for load]",
            _ => "INSTALL [for install]",
        }
    }

    fn command(&self) -> Command {
        Command::new(cla::GP, ins::INSTALL, self.p1, 0x00).with_data(self.data.clone())
    }

    fn parse_response(&self, response: Response) -> Result<()> {
        response.check(self.name())?;
        Ok(())
    }
}
