//! Command dispatch: bridges CLI args -> resource controller -> output.

pub mod config_cmd;
pub mod resources;
pub mod util;

use netdesk_core::{Device, User};

use crate::cli::{Command, GlobalOpts, UsersCommand};
use crate::config;
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;

    match cmd {
        Command::Devices(args) => resources::handle::<Device>(args.command, &resolved, global).await,
        Command::Users(args) => match args.command {
            UsersCommand::Common(cmd) => resources::handle::<User>(cmd, &resolved, global).await,
            UsersCommand::ResetPassword { id } => {
                resources::reset_password(id, &resolved, global).await
            }
        },
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
