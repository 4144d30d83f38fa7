//! `cloudimg logout` — forget the stored session.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::TokenStore;

/// Run `cloudimg logout`. Succeeds when nothing is stored.
///
/// # Errors
///
/// Returns an error if the credentials file cannot be removed.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let was_logged_in = app.token_store.load_tokens().await.ok().flatten().is_some();
    app.token_store.clear_tokens().await?;
    app.renderer().render_logout(was_logged_in)?;
    Ok(ExitCode::SUCCESS)
}
