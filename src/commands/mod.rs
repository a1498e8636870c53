// ABOUTME: Command module aggregator for the heckx-deploy CLI.
// ABOUTME: Re-exports deploy, rollback and list-backups command handlers.

mod confirm;
mod deploy;
mod list_backups;
mod rollback;
mod toolchain;

pub use deploy::deploy;
pub use list_backups::list_backups;
pub use rollback::rollback;
