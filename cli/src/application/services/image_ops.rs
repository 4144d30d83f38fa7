//! Application service — image create, activate and deactivate use-cases.
//!
//! Each operation submits its mutating request (unless one is already in
//! flight) and then drives the poller against the matching status endpoint.

use std::path::Path;

use anyhow::{Context, Result};
use cloudimg_common::{CreateImageRequest, ImageRecord, TaskStatus};
use tracing::info;

use crate::application::ports::{ImageApi, ProgressReporter};
use crate::application::services::poller::poll_target;
use crate::domain::error::ImageError;
use crate::domain::image::{TransitionPlan, plan_activation, plan_deactivation, validate_image_name};
use crate::domain::poll::{PollOutcome, PollSettings, PollTarget};

/// What `create_image` was asked to do.
#[derive(Debug, Clone)]
pub struct CreateImage<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub file: &'a Path,
    /// Return right after the task is submitted.
    pub wait: bool,
}

/// Result of an image creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Task submitted; not waited for.
    Submitted { task_id: String },
    /// Task finished and produced an image.
    Created { task_id: String, image_id: String },
}

/// Result of an activate/deactivate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The image was already in the requested state.
    AlreadyDone(ImageRecord),
    /// Request submitted; not waited for.
    Submitted,
    /// Transition finished. `joined` is set when an in-flight transition was
    /// awaited instead of submitting a new one.
    Completed { image: ImageRecord, joined: bool },
}

/// Upload an artifact, submit an image creation task and optionally wait.
///
/// # Errors
///
/// Returns an error if the name is invalid, the file cannot be read, any API
/// call fails permanently, or the task fails or times out.
pub async fn create_image(
    api: &impl ImageApi,
    reporter: &impl ProgressReporter,
    request: &CreateImage<'_>,
    settings: PollSettings,
) -> Result<CreateOutcome> {
    validate_image_name(request.name)?;

    let body = tokio::fs::read(request.file)
        .await
        .with_context(|| format!("cannot read {}", request.file.display()))?;
    let file_name = request
        .file
        .file_name()
        .map_or_else(|| request.name.to_string(), |n| n.to_string_lossy().into_owned());
    let size = u64::try_from(body.len()).context("artifact too large")?;

    reporter.step(&format!("Uploading {file_name} ({size} bytes)..."));
    let slot = api
        .begin_upload(&file_name, size)
        .await
        .context("cannot reserve upload")?;
    api.upload(&slot, body).await.context("upload failed")?;

    let created = api
        .create_image(&CreateImageRequest {
            name: request.name.to_string(),
            description: request.description.map(str::to_string),
            upload_id: slot.upload_id,
        })
        .await
        .context("cannot submit image creation")?;
    info!(task_id = %created.task_id, "image creation task submitted");
    reporter.success(&format!("Image creation task {} submitted", created.task_id));

    if !request.wait {
        return Ok(CreateOutcome::Submitted {
            task_id: created.task_id,
        });
    }

    let image_id = wait_for_task(api, reporter, &created.task_id, settings).await?;
    Ok(CreateOutcome::Created {
        task_id: created.task_id,
        image_id,
    })
}

/// Wait for an image creation task and return the produced image id.
///
/// # Errors
///
/// Returns `ImageError::Failed` / `ImageError::TimedOut` for terminal
/// failures, or the permanent API error that stopped the loop.
pub async fn wait_for_task(
    api: &impl ImageApi,
    reporter: &impl ProgressReporter,
    task_id: &str,
    settings: PollSettings,
) -> Result<String> {
    let target = PollTarget::create_task(task_id);
    reporter.step(&format!("Waiting for {}...", target.describe()));
    let outcome = poll_target(&target, move || api.task_status(task_id), settings, reporter)
        .await
        .with_context(|| format!("cannot check {}", target.describe()))?;

    let status: TaskStatus = settle(&target, outcome, settings, |t: &TaskStatus| {
        t.message.clone()
    })?;
    status.result_id.ok_or_else(|| {
        ImageError::MissingResult {
            task_id: task_id.to_string(),
        }
        .into()
    })
}

/// Activate an image, joining an activation that is already running.
///
/// # Errors
///
/// Returns an error if the image cannot be fetched, the activation request is
/// rejected, or the activation fails or times out.
pub async fn activate_image(
    api: &impl ImageApi,
    reporter: &impl ProgressReporter,
    image_id: &str,
    wait: bool,
    settings: PollSettings,
) -> Result<TransitionOutcome> {
    let target = PollTarget::activation(image_id);
    let current = api
        .get_image(image_id)
        .await
        .with_context(|| format!("cannot look up {}", target.describe()))?;

    let plan = plan_activation(&current.status);
    match plan {
        TransitionPlan::AlreadyDone => return Ok(TransitionOutcome::AlreadyDone(current)),
        TransitionPlan::Join => {
            reporter.step(&format!("Activation of {} already in progress", target.describe()));
        }
        TransitionPlan::Submit => {
            api.activate_image(image_id)
                .await
                .with_context(|| format!("cannot activate {}", target.describe()))?;
            reporter.success(&format!("Activation of {} requested", target.describe()));
        }
    }

    finish_transition(api, reporter, &target, plan, wait, settings).await
}

/// Deactivate an image, joining a deactivation that is already running.
///
/// # Errors
///
/// Returns an error if the image cannot be fetched, the deactivation request
/// is rejected, or the deactivation fails or times out.
pub async fn deactivate_image(
    api: &impl ImageApi,
    reporter: &impl ProgressReporter,
    image_id: &str,
    wait: bool,
    settings: PollSettings,
) -> Result<TransitionOutcome> {
    let target = PollTarget::deactivation(image_id);
    let current = api
        .get_image(image_id)
        .await
        .with_context(|| format!("cannot look up {}", target.describe()))?;

    let plan = plan_deactivation(&current.status);
    match plan {
        TransitionPlan::AlreadyDone => return Ok(TransitionOutcome::AlreadyDone(current)),
        TransitionPlan::Join => {
            reporter.step(&format!(
                "Deactivation of {} already in progress",
                target.describe()
            ));
        }
        TransitionPlan::Submit => {
            api.deactivate_image(image_id)
                .await
                .with_context(|| format!("cannot deactivate {}", target.describe()))?;
            reporter.success(&format!("Deactivation of {} requested", target.describe()));
        }
    }

    finish_transition(api, reporter, &target, plan, wait, settings).await
}

async fn finish_transition(
    api: &impl ImageApi,
    reporter: &impl ProgressReporter,
    target: &PollTarget,
    plan: TransitionPlan,
    wait: bool,
    settings: PollSettings,
) -> Result<TransitionOutcome> {
    if !wait {
        return Ok(TransitionOutcome::Submitted);
    }

    reporter.step(&format!("Waiting for {}...", target.describe()));
    let outcome = poll_target(target, move || api.get_image(&target.id), settings, reporter)
        .await
        .with_context(|| format!("cannot check {}", target.describe()))?;
    let image = settle(target, outcome, settings, |i: &ImageRecord| {
        i.status_message.clone()
    })?;

    Ok(TransitionOutcome::Completed {
        image,
        joined: plan == TransitionPlan::Join,
    })
}

/// Turn a poll outcome into the final status or a typed `ImageError`.
fn settle<S: crate::application::services::poller::StatusReport>(
    target: &PollTarget,
    outcome: PollOutcome<S>,
    settings: PollSettings,
    message: impl Fn(&S) -> Option<String>,
) -> Result<S> {
    match outcome {
        PollOutcome::Success(s) => Ok(s),
        PollOutcome::Failure(s) => Err(ImageError::Failed {
            operation: target.operation(),
            target: target.describe(),
            status: s.status().to_string(),
            message: message(&s),
        }
        .into()),
        PollOutcome::TimedOut => Err(ImageError::TimedOut {
            operation: target.operation(),
            target: target.describe(),
            waited: settings.timeout,
        }
        .into()),
    }
}
