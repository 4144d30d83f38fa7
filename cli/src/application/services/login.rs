//! Application service — browser login.
//!
//! Sequence: sign-in URL → callback port → listener → browser → code →
//! token exchange → persistence. Imports only from `crate::domain` and
//! `crate::application`.

use std::time::Duration;

use anyhow::Result;
use cloudimg_common::Tokens;
use tracing::{debug, info, warn};

use crate::application::ports::{
    BrowserLauncher, CallbackListener, OAuthApi, PendingCallback, PortProbe, ProgressReporter,
    TokenStore,
};
use crate::application::services::port_allocator::select_port;
use crate::domain::error::AuthError;
use crate::domain::oauth::{callback_url, expected_state};

/// Inputs of one login attempt.
#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub client_type: String,
    pub default_port: u16,
    /// How long to wait for the browser redirect.
    pub callback_timeout: Duration,
    /// Skip the browser launcher and only show the URL.
    pub open_browser: bool,
}

/// Infrastructure a login attempt runs against.
pub struct LoginPorts<'a, A, L, B, P, S> {
    pub api: &'a A,
    pub listener: &'a L,
    pub browser: &'a B,
    pub probe: &'a P,
    pub store: &'a S,
}

/// Result of a completed login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub tokens: Tokens,
    /// Callback port the code was delivered to.
    pub port: u16,
    /// Set when the tokens could not be written locally. The server-side
    /// login still succeeded.
    pub save_error: Option<String>,
}

/// Run the browser login flow.
///
/// # Errors
///
/// Returns an `AuthError` (inside `anyhow::Error`) when the sign-in URL
/// cannot be obtained, no callback port is free, the callback fails or times
/// out, or the token exchange is rejected. A failure to persist tokens is not
/// an error; it is reported through `LoginOutcome::save_error`.
pub async fn login<A, L, B, P, S>(
    ports: &LoginPorts<'_, A, L, B, P, S>,
    reporter: &impl ProgressReporter,
    settings: &LoginSettings,
) -> Result<LoginOutcome>
where
    A: OAuthApi,
    L: CallbackListener,
    B: BrowserLauncher,
    P: PortProbe,
    S: TokenStore,
{
    reporter.step("Requesting sign-in URL...");
    let initial = ports
        .api
        .oauth_url(&settings.client_type, settings.default_port)
        .await
        .map_err(AuthError::SignInUrl)?;

    let port = select_port(
        ports.probe,
        settings.default_port,
        &initial.alternative_ports,
    )?;

    // The server embeds the port in the redirect URI, so a fallback port
    // needs a freshly minted URL.
    let invocation_url = if port == settings.default_port {
        initial.invocation_url
    } else {
        reporter.step(&format!(
            "Port {} is in use, signing in through port {port}",
            settings.default_port
        ));
        ports
            .api
            .oauth_url(&settings.client_type, port)
            .await
            .map_err(AuthError::SignInUrl)?
            .invocation_url
    };

    let state = expected_state(&invocation_url);
    debug!(
        redirect = %callback_url(port),
        state_bound = state.is_some(),
        "starting callback listener"
    );
    let pending = ports.listener.bind(port, state).await?;

    if settings.open_browser {
        match ports.browser.open(&invocation_url) {
            Ok(()) => reporter.step("Opened your browser to complete sign-in"),
            Err(e) => {
                warn!(error = %e, "browser launch failed");
                reporter.warn("Could not open a browser automatically");
            }
        }
    }
    reporter.step(&format!("If the browser did not open, visit:\n    {invocation_url}"));
    reporter.step("Waiting for sign-in to complete...");

    let code = pending.wait(settings.callback_timeout).await?;
    info!(port, "authorization code received");

    let tokens = ports
        .api
        .translate_token(&code, port)
        .await
        .map_err(|e| AuthError::TokenExchange {
            code: e.code(),
            message: e.to_string(),
        })?;

    let save_error = match ports.store.save_tokens(&tokens).await {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "could not persist tokens");
            reporter.warn(&format!(
                "Logged in, but saving credentials locally failed: {e:#}"
            ));
            Some(format!("{e:#}"))
        }
    };

    Ok(LoginOutcome {
        tokens,
        port,
        save_error,
    })
}
