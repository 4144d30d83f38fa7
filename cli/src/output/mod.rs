//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use cloudimg_common::{ImageRecord, Tokens};
use console::Term;
use owo_colors::OwoColorize as _;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

use crate::application::services::image_ops::{CreateOutcome, TransitionOutcome};
use crate::application::services::login::LoginOutcome;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Renderer for the active output mode.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(r) => r.render_version(version),
        }
    }

    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn render_images(&self, images: &[ImageRecord]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_images(images);
                Ok(())
            }
            Self::Json(r) => r.render_images(images),
        }
    }

    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn render_auth_status(&self, tokens: Option<&Tokens>, now: DateTime<Utc>) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_auth_status(tokens, now);
                Ok(())
            }
            Self::Json(r) => r.render_auth_status(tokens, now),
        }
    }

    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn render_login(&self, outcome: &LoginOutcome) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_login(outcome);
                Ok(())
            }
            Self::Json(r) => r.render_login(outcome),
        }
    }

    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn render_logout(&self, was_logged_in: bool) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_logout(was_logged_in);
                Ok(())
            }
            Self::Json(r) => r.render_logout(was_logged_in),
        }
    }

    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn render_config(&self, entries: &[(&str, String)], path: &Path) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config(entries, path);
                Ok(())
            }
            Self::Json(r) => r.render_config(entries, path),
        }
    }

    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn render_config_set(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config_set(key, value);
                Ok(())
            }
            Self::Json(r) => r.render_config_set(key, value),
        }
    }

    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn render_create(&self, outcome: &CreateOutcome) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_create(outcome);
                Ok(())
            }
            Self::Json(r) => r.render_create(outcome),
        }
    }

    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn render_transition(
        &self,
        action: &str,
        image_id: &str,
        outcome: &TransitionOutcome,
    ) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_transition(action, image_id, outcome);
                Ok(())
            }
            Self::Json(r) => r.render_transition(action, image_id, outcome),
        }
    }
}
