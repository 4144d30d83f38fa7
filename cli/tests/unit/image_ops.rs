//! Unit tests for the image create / activate / deactivate use-cases.

#![allow(clippy::expect_used)]

use std::time::Duration;

use cloudimg_cli::application::services::image_ops::{
    CreateImage, CreateOutcome, TransitionOutcome, activate_image, create_image, deactivate_image,
};
use cloudimg_cli::domain::error::{ImageError, error_code};
use cloudimg_cli::domain::poll::PollSettings;
use tempfile::NamedTempFile;

use crate::mocks::{FakeImageApi, RecordingReporter, image, task};

fn settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_secs(5),
        timeout: Duration::from_secs(60),
    }
}

fn artifact(bytes: &[u8]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    std::fs::write(file.path(), bytes).expect("write artifact");
    file
}

// ── create ────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_create_uploads_submits_and_waits() {
    let api = FakeImageApi::with_tasks(vec![Ok(task("Preparing")), Ok(task("Finished"))]);
    let reporter = RecordingReporter::default();
    let file = artifact(b"disk-bytes");

    let outcome = create_image(
        &api,
        &reporter,
        &CreateImage {
            name: "base-2024",
            description: Some("nightly"),
            file: file.path(),
            wait: true,
        },
        settings(),
    )
    .await
    .expect("create");

    assert_eq!(
        outcome,
        CreateOutcome::Created {
            task_id: "t-1".to_string(),
            image_id: "img-9".to_string(),
        }
    );
    assert_eq!(api.uploaded.borrow().as_slice(), b"disk-bytes");
    assert_eq!(
        api.calls.borrow()[..3],
        ["begin_upload", "upload", "create_image"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_create_without_wait_returns_task_id() {
    let api = FakeImageApi::default();
    let reporter = RecordingReporter::default();
    let file = artifact(b"x");

    let outcome = create_image(
        &api,
        &reporter,
        &CreateImage {
            name: "base",
            description: None,
            file: file.path(),
            wait: false,
        },
        settings(),
    )
    .await
    .expect("create");

    assert_eq!(
        outcome,
        CreateOutcome::Submitted {
            task_id: "t-1".to_string()
        }
    );
    assert_eq!(api.called("task_status"), 0);
}

#[tokio::test]
async fn test_create_rejects_invalid_name_before_any_request() {
    let api = FakeImageApi::default();
    let reporter = RecordingReporter::default();
    let file = artifact(b"x");

    let err = create_image(
        &api,
        &reporter,
        &CreateImage {
            name: "Bad Name",
            description: None,
            file: file.path(),
            wait: true,
        },
        settings(),
    )
    .await
    .expect_err("invalid name");

    assert_eq!(error_code(&err), "invalid_name");
    assert!(api.calls.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_create_failed_task_carries_status_and_message() {
    let mut failed = task("Failed");
    failed.message = Some("corrupt artifact".to_string());
    let api = FakeImageApi::with_tasks(vec![Ok(failed)]);
    let reporter = RecordingReporter::default();
    let file = artifact(b"x");

    let err = create_image(
        &api,
        &reporter,
        &CreateImage {
            name: "base",
            description: None,
            file: file.path(),
            wait: true,
        },
        settings(),
    )
    .await
    .expect_err("task failed");

    assert_eq!(error_code(&err), "task_failed");
    let msg = format!("{err:#}");
    assert!(msg.contains("Failed"), "got: {msg}");
    assert!(msg.contains("corrupt artifact"), "got: {msg}");
}

// ── activate / deactivate ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_activate_already_published_is_a_no_op() {
    let api = FakeImageApi::with_images(vec![Ok(image("img-1", "RESOURCE_PUBLISHED"))]);
    let reporter = RecordingReporter::default();

    let outcome = activate_image(&api, &reporter, "img-1", true, settings())
        .await
        .expect("activate");

    assert!(matches!(outcome, TransitionOutcome::AlreadyDone(_)));
    assert_eq!(api.called("activate_image"), 0);
    assert_eq!(api.called("get_image"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_activate_joins_in_flight_deployment() {
    let api = FakeImageApi::with_images(vec![
        Ok(image("img-1", "RESOURCE_DEPLOYING")),
        Ok(image("img-1", "RESOURCE_DEPLOYING")),
        Ok(image("img-1", "RESOURCE_PUBLISHED")),
    ]);
    let reporter = RecordingReporter::default();

    let outcome = activate_image(&api, &reporter, "img-1", true, settings())
        .await
        .expect("activate");

    match outcome {
        TransitionOutcome::Completed { image, joined } => {
            assert!(joined);
            assert_eq!(image.status, "RESOURCE_PUBLISHED");
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(api.called("activate_image"), 0);
    assert!(reporter.contains("already in progress"));
}

#[tokio::test(start_paused = true)]
async fn test_activate_submits_then_polls() {
    let api = FakeImageApi::with_images(vec![
        Ok(image("img-1", "IMAGE_AVAILABLE")),
        Ok(image("img-1", "RESOURCE_DEPLOYING")),
        Ok(image("img-1", "RESOURCE_PUBLISHED")),
    ]);
    let reporter = RecordingReporter::default();

    let outcome = activate_image(&api, &reporter, "img-1", true, settings())
        .await
        .expect("activate");

    assert!(matches!(
        outcome,
        TransitionOutcome::Completed { joined: false, .. }
    ));
    assert_eq!(api.called("activate_image"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_activate_timeout_is_distinct_from_failure() {
    let api = FakeImageApi::with_images(vec![
        Ok(image("img-1", "IMAGE_AVAILABLE")),
        Ok(image("img-1", "RESOURCE_DEPLOYING")),
    ]);
    let reporter = RecordingReporter::default();

    let err = activate_image(&api, &reporter, "img-1", true, settings())
        .await
        .expect_err("timeout");

    assert_eq!(error_code(&err), "poll_timeout");
    assert!(matches!(
        err.downcast_ref::<ImageError>(),
        Some(ImageError::TimedOut { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_deactivate_without_wait_only_submits() {
    let api = FakeImageApi::with_images(vec![Ok(image("img-1", "RESOURCE_PUBLISHED"))]);
    let reporter = RecordingReporter::default();

    let outcome = deactivate_image(&api, &reporter, "img-1", false, settings())
        .await
        .expect("deactivate");

    assert_eq!(outcome, TransitionOutcome::Submitted);
    assert_eq!(api.called("deactivate_image"), 1);
    assert_eq!(api.called("get_image"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deactivate_already_available_is_a_no_op() {
    let api = FakeImageApi::with_images(vec![Ok(image("img-1", "IMAGE_AVAILABLE"))]);
    let reporter = RecordingReporter::default();

    let outcome = deactivate_image(&api, &reporter, "img-1", true, settings())
        .await
        .expect("deactivate");

    assert!(matches!(outcome, TransitionOutcome::AlreadyDone(_)));
    assert_eq!(api.called("deactivate_image"), 0);
}
