//! `cloudimg login` — browser sign-in.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::login::{self, LoginPorts, LoginSettings};
use crate::infra::browser::SystemBrowser;
use crate::infra::callback::AxumCallbackListener;
use crate::infra::port_probe::TcpPortProbe;

/// Arguments for the login command.
#[derive(Args, Debug, Default)]
pub struct LoginArgs {
    /// Preferred local callback port (overrides `auth.callback_port`)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Print the sign-in URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,
}

/// Run `cloudimg login`.
///
/// # Errors
///
/// Returns an error if any step of the login flow fails.
pub async fn run(app: &AppContext, args: &LoginArgs) -> Result<ExitCode> {
    let config = app.config()?;
    let client = app.anonymous_client(&config)?;
    let settings = LoginSettings {
        client_type: config.auth.client_type.clone(),
        default_port: args.port.unwrap_or(config.auth.callback_port),
        callback_timeout: config.login_timeout(),
        open_browser: !args.no_browser,
    };
    let ports = LoginPorts {
        api: &client,
        listener: &AxumCallbackListener,
        browser: &SystemBrowser,
        probe: &TcpPortProbe,
        store: &app.token_store,
    };

    let outcome = {
        let reporter = app.reporter();
        tokio::select! {
            result = login::login(&ports, &reporter, &settings) => result?,
            () = interrupted() => anyhow::bail!("Login cancelled"),
        }
    };
    app.renderer().render_login(&outcome)?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl-C. Dropping the login future closes the callback listener.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("login interrupted");
}
