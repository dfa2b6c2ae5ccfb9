//! Card manager command builders
//!
//! Each command implements [`ApduCommand`](nexum_keycard_apdu::ApduCommand)
//! so it can be executed over a plain or SCP02-protected channel.

mod delete;
mod external_authenticate;
mod get_status;
mod initialize_update;
mod install;
mod load;
mod select;

pub use delete::{DeleteCommand, DeleteOutcome};
pub use external_authenticate::ExternalAuthenticateCommand;
pub use get_status::{GetStatusCommand, IssuerSecurityDomainStatus};
pub use initialize_update::InitializeUpdateCommand;
pub use install::InstallCommand;
pub use load::LoadCommand;
pub use select::SelectCommand;
