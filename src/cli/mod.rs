//! CLI module for tether.
//!
//! This module provides the command-line front end:
//! - Argument parsing
//! - Version display
//! - Command handlers over a [`Session`]
//!
//! # Usage
//!
//! ```ignore
//! use tether::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args())?;
//! run_cli_command(command).await?;
//! ```

pub mod args;
pub mod commands;
pub mod version;

pub use args::{parse_args, ArgsError, CliCommand, USAGE};
pub use version::{version_line, VERSION};

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::config::ClientConfig;
use crate::session::Session;

/// Run a parsed command.
///
/// `Version` and `Help` need no configuration; everything else builds a
/// [`Session`] from the environment.
pub async fn run_cli_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            return Ok(());
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        _ => {}
    }

    let config = ClientConfig::from_env().wrap_err("Invalid configuration")?;
    let session = Session::new(config)?;

    match command {
        CliCommand::Login { email } => {
            let password = prompt_password("Password: ").await?;
            commands::login(&session, &email, &password).await
        }
        CliCommand::Logout => commands::logout(&session).await,
        CliCommand::ChangePassword => {
            let current = prompt_password("Current password: ").await?;
            let new = prompt_password("New password: ").await?;
            if prompt_password("Repeat new password: ").await? != new {
                color_eyre::eyre::bail!("Passwords do not match.");
            }
            commands::change_password(&session, &current, &new).await
        }
        CliCommand::Follow { kind, id } => commands::follow(&session, kind, &id).await,
        CliCommand::Unfollow { kind, id } => commands::unfollow(&session, kind, &id).await,
        CliCommand::Report {
            target,
            reason,
            details,
        } => commands::report(&session, target, reason, details).await,
        CliCommand::Watch => commands::watch(&session).await,
        CliCommand::Version | CliCommand::Help => Ok(()),
    }
}

/// Read a password without echo. Runs on a blocking thread.
async fn prompt_password(prompt: &'static str) -> Result<String> {
    tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt))
        .await?
        .wrap_err("Could not read password")
}
