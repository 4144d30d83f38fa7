//! JSON output helpers.
//!
//! `JsonRenderer` prints one pretty-printed JSON document per command on
//! stdout; `format_error` builds the error object every `--json` code path
//! prints when a command fails.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cloudimg_common::{ImageRecord, Tokens};
use serde_json::{Value, json};

use crate::application::services::image_ops::{CreateOutcome, TransitionOutcome};
use crate::application::services::login::LoginOutcome;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Renders command results as JSON documents on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &Value) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    pub fn render_version(&self, version: &str) -> Result<()> {
        Self::print(&json!({ "version": version }))
    }

    pub fn render_images(&self, images: &[ImageRecord]) -> Result<()> {
        Self::print(&json!({ "images": images }))
    }

    pub fn render_auth_status(&self, tokens: Option<&Tokens>, now: DateTime<Utc>) -> Result<()> {
        let value = match tokens {
            None => json!({ "logged_in": false }),
            Some(t) => json!({
                "logged_in": !t.is_expired(now),
                "expired": t.is_expired(now),
                "session_id": t.session_id,
                "expires_at": t.expires_at.to_rfc3339(),
            }),
        };
        Self::print(&value)
    }

    pub fn render_login(&self, outcome: &LoginOutcome) -> Result<()> {
        Self::print(&json!({
            "logged_in": true,
            "session_id": outcome.tokens.session_id,
            "expires_at": outcome.tokens.expires_at.to_rfc3339(),
            "callback_port": outcome.port,
            "saved": outcome.save_error.is_none(),
            "save_error": outcome.save_error,
        }))
    }

    pub fn render_logout(&self, was_logged_in: bool) -> Result<()> {
        Self::print(&json!({ "logged_out": true, "had_session": was_logged_in }))
    }

    pub fn render_config(&self, entries: &[(&str, String)], path: &Path) -> Result<()> {
        let settings: serde_json::Map<String, Value> = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::String(v.clone())))
            .collect();
        Self::print(&json!({
            "path": path.display().to_string(),
            "settings": settings,
        }))
    }

    pub fn render_config_set(&self, key: &str, value: &str) -> Result<()> {
        Self::print(&json!({ "key": key, "value": value }))
    }

    pub fn render_create(&self, outcome: &CreateOutcome) -> Result<()> {
        let value = match outcome {
            CreateOutcome::Submitted { task_id } => {
                json!({ "task_id": task_id, "status": "submitted" })
            }
            CreateOutcome::Created { task_id, image_id } => {
                json!({ "task_id": task_id, "image_id": image_id, "status": "finished" })
            }
        };
        Self::print(&value)
    }

    pub fn render_transition(
        &self,
        action: &str,
        image_id: &str,
        outcome: &TransitionOutcome,
    ) -> Result<()> {
        let value = match outcome {
            TransitionOutcome::AlreadyDone(image) => json!({
                "action": action,
                "image_id": image_id,
                "result": "unchanged",
                "image": image,
            }),
            TransitionOutcome::Submitted => json!({
                "action": action,
                "image_id": image_id,
                "result": "submitted",
            }),
            TransitionOutcome::Completed { image, joined } => json!({
                "action": action,
                "image_id": image_id,
                "result": "completed",
                "joined": joined,
                "image": image,
            }),
        };
        Self::print(&value)
    }
}
