//! Human-readable terminal renderer.

use std::path::Path;

use chrono::{DateTime, Utc};
use cloudimg_common::{ImageRecord, Tokens};
use owo_colors::OwoColorize as _;

use crate::application::services::image_ops::{CreateOutcome, TransitionOutcome};
use crate::application::services::login::LoginOutcome;
use crate::output::OutputContext;

/// Renders command results as human-readable terminal output using
/// `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        println!("cloudimg {version}");
    }

    /// Render the image table.
    pub fn render_images(&self, images: &[ImageRecord]) {
        if images.is_empty() {
            if !self.ctx.quiet {
                println!("No images yet. Create one: cloudimg image create <name> --file <path>");
            }
            return;
        }

        let id_width = column_width(images.iter().map(|i| i.id.as_str()), "ID");
        let name_width = column_width(images.iter().map(|i| i.name.as_str()), "NAME");
        println!(
            "  {:<id_width$}  {:<name_width$}  {}",
            "ID".style(self.ctx.styles.bold),
            "NAME".style(self.ctx.styles.bold),
            "STATUS".style(self.ctx.styles.bold),
        );
        for image in images {
            println!(
                "  {:<id_width$}  {:<name_width$}  {}",
                image.id,
                image.name,
                self.styled_status(&image.status),
            );
        }
    }

    /// Render the stored session.
    pub fn render_auth_status(&self, tokens: Option<&Tokens>, now: DateTime<Utc>) {
        let Some(tokens) = tokens else {
            self.ctx.warn("Not logged in. Run 'cloudimg login'.");
            return;
        };
        if tokens.is_expired(now) {
            self.ctx.warn("Session expired. Run 'cloudimg login' again.");
        } else {
            self.ctx.success("Logged in");
        }
        self.ctx.kv("Session:", &tokens.session_id);
        self.ctx.kv(
            "Expires:",
            &format!(
                "{} ({})",
                tokens.expires_at.format("%Y-%m-%d %H:%M UTC"),
                format_expiry(tokens.expires_at, now)
            ),
        );
    }

    pub fn render_login(&self, outcome: &LoginOutcome) {
        self.ctx.success("Logged in");
        self.ctx.kv("Session:", &outcome.tokens.session_id);
        self.ctx.kv(
            "Expires:",
            &format_expiry(outcome.tokens.expires_at, Utc::now()),
        );
    }

    pub fn render_logout(&self, was_logged_in: bool) {
        if was_logged_in {
            self.ctx.success("Logged out");
        } else {
            self.ctx.info("Not logged in; nothing to do");
        }
    }

    /// Render the current configuration.
    pub fn render_config(&self, entries: &[(&str, String)], path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        for (key, value) in entries {
            println!("  {:<26} {value}", format!("{key}:"));
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["CLOUDIMG_CONFIG", "CLOUDIMG_API_URL", "CLOUDIMG_CREDENTIALS", "NO_COLOR"] {
            println!(
                "    {:<22} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
    }

    pub fn render_config_set(&self, key: &str, value: &str) {
        self.ctx.success(&format!("Set {key} = {value}"));
    }

    pub fn render_create(&self, outcome: &CreateOutcome) {
        match outcome {
            CreateOutcome::Submitted { task_id } => {
                self.ctx.info(&format!(
                    "Not waiting. Follow progress with: cloudimg image task {task_id}"
                ));
            }
            CreateOutcome::Created { image_id, .. } => {
                self.ctx.success(&format!("Image {image_id} created"));
            }
        }
    }

    pub fn render_transition(&self, action: &str, image_id: &str, outcome: &TransitionOutcome) {
        match outcome {
            TransitionOutcome::AlreadyDone(image) => self.ctx.info(&format!(
                "Image {image_id} is already {} ({}); nothing to {action}",
                past_tense(action),
                image.status
            )),
            TransitionOutcome::Submitted => {
                self.ctx.info("Not waiting. Check progress with: cloudimg image list");
            }
            TransitionOutcome::Completed { image, .. } => self.ctx.success(&format!(
                "Image {image_id} {} ({})",
                past_tense(action),
                image.status
            )),
        }
    }

    fn styled_status(&self, status: &str) -> String {
        let style = match status {
            "RESOURCE_PUBLISHED" | "IMAGE_AVAILABLE" => self.ctx.styles.success,
            "RESOURCE_FAILED" | "RESOURCE_CEASED" => self.ctx.styles.error,
            "RESOURCE_DEPLOYING" | "RESOURCE_DELETING" => self.ctx.styles.warning,
            _ => self.ctx.styles.dim,
        };
        status.style(style).to_string()
    }
}

// ── Display helpers ──────────────────────────────────────────────────────────

fn column_width<'s>(values: impl Iterator<Item = &'s str>, header: &str) -> usize {
    values
        .map(|v| v.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(header.len())
}

fn past_tense(action: &str) -> &'static str {
    match action {
        "activate" => "activated",
        "deactivate" => "deactivated",
        _ => "done",
    }
}

/// Relative expiry, e.g. `in 3h 12m` or `expired 5m ago`.
#[must_use]
pub fn format_expiry(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = expires_at.signed_duration_since(now);
    let secs = delta.num_seconds().unsigned_abs();
    let span = if secs >= 86_400 {
        format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3600)
    } else if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    };
    if delta.num_seconds() > 0 {
        format!("in {span}")
    } else {
        format!("expired {span} ago")
    }
}
