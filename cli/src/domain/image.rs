//! Image naming rules and status helpers.
//!
//! Pure functions only — no I/O, no async.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::domain::error::ImageError;

/// Image names end up in URLs and registry paths on the server side.
pub static IMAGE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern — cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9][a-z0-9._-]{0,62}$").expect("valid regex")
});

pub const STATUS_PUBLISHED: &str = "RESOURCE_PUBLISHED";
pub const STATUS_DEPLOYING: &str = "RESOURCE_DEPLOYING";
pub const STATUS_DELETING: &str = "RESOURCE_DELETING";
pub const STATUS_AVAILABLE: &str = "IMAGE_AVAILABLE";

/// Validate an image name before it is sent to the server.
///
/// # Errors
///
/// Returns `ImageError::InvalidName` if the name does not match `IMAGE_NAME_RE`.
pub fn validate_image_name(name: &str) -> Result<()> {
    if !IMAGE_NAME_RE.is_match(name) {
        return Err(ImageError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

/// What an activate/deactivate request should do given the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Already in the requested end state; nothing to submit or wait for.
    AlreadyDone,
    /// A matching transition is running; wait for it without resubmitting.
    Join,
    /// Submit the mutating request, then wait.
    Submit,
}

#[must_use]
pub fn plan_activation(current_status: &str) -> TransitionPlan {
    match current_status {
        STATUS_PUBLISHED => TransitionPlan::AlreadyDone,
        STATUS_DEPLOYING => TransitionPlan::Join,
        _ => TransitionPlan::Submit,
    }
}

#[must_use]
pub fn plan_deactivation(current_status: &str) -> TransitionPlan {
    match current_status {
        STATUS_AVAILABLE => TransitionPlan::AlreadyDone,
        STATUS_DELETING => TransitionPlan::Join,
        _ => TransitionPlan::Submit,
    }
}
