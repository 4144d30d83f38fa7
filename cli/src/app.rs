//! Application context — unified state passed to every command handler.
//!
//! `AppContext` owns the output context, the config and credential stores,
//! and knows how to build the REST client for this invocation. Adding a new
//! cross-cutting concern requires only one field change here — zero command
//! signatures change.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::CliConfig;
use crate::infra::api_client::RestClient;
use crate::infra::config::YamlConfigStore;
use crate::infra::token_store::FileTokenStore;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `CLOUDIMG_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
///
/// Constructed once in `Cli::run()` and passed as `&AppContext` to all
/// command handlers.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode). Quiet in JSON mode so
    /// progress never mixes with the JSON document.
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// `~/.cloudimg/config.yaml`.
    pub config_store: YamlConfigStore,
    /// `~/.cloudimg/credentials.json`.
    pub token_store: FileTokenStore,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `CLOUDIMG_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("CLOUDIMG_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Ok(Self {
            output: OutputContext::new(
                flags.output.no_color,
                flags.output.quiet || flags.output.json,
            ),
            mode,
            config_store: YamlConfigStore::default(),
            token_store: FileTokenStore::new()?,
            non_interactive,
        })
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress reporter for application services.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Load the effective configuration: file values over defaults, with
    /// `CLOUDIMG_API_URL` taking precedence over `api.url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn config(&self) -> Result<CliConfig> {
        let mut config = self.config_store.load()?;
        if let Ok(url) = std::env::var("CLOUDIMG_API_URL")
            && !url.trim().is_empty()
        {
            config.api.url = url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    /// REST client without session credentials (login flow).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn anonymous_client(&self, config: &CliConfig) -> Result<RestClient> {
        RestClient::new(&config.api.url, config.request_timeout())
    }

    /// REST client carrying the stored session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotLoggedIn` / `AuthError::SessionExpired` when no
    /// usable session is stored, or an error if the client cannot be built.
    pub async fn session_client(&self, config: &CliConfig) -> Result<RestClient> {
        let tokens = self.token_store.require_session().await?;
        Ok(self.anonymous_client(config)?.with_tokens(&tokens))
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `CLOUDIMG_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
