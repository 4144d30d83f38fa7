//! `cloudimg auth` — inspect the stored session.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::TokenStore;

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Show whether a session is stored and when it expires
    Status,
}

/// Run the auth command.
///
/// # Errors
///
/// Returns an error if the credentials file exists but cannot be read.
pub async fn run(app: &AppContext, cmd: &AuthCommand) -> Result<ExitCode> {
    match cmd {
        AuthCommand::Status => {
            let tokens = app.token_store.load_tokens().await?;
            app.renderer()
                .render_auth_status(tokens.as_ref(), chrono::Utc::now())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
