//! `cloudimg image` against a fake image service.
//!
//! The binary is blocking, so it runs on a blocking thread while the fake
//! service keeps serving on the runtime.

#![allow(clippy::expect_used)]

use std::process::Output;

use tempfile::TempDir;

use crate::support::{FakeApi, FakeState, cloudimg, session_tokens, write_credentials};

/// Run the binary logged in against `api`, with a 1 s poll interval.
async fn run_logged_in(api: &FakeApi, args: &[&str]) -> Output {
    let dir = TempDir::new().expect("tempdir");
    let credentials = dir.path().join("credentials.json");
    let config = dir.path().join("config.yaml");
    write_credentials(&credentials, &session_tokens(1));
    std::fs::write(&config, "poll:\n  interval_secs: 1\n  timeout_secs: 30\n").expect("config");

    let mut cmd = cloudimg();
    cmd.env("CLOUDIMG_CREDENTIALS", &credentials)
        .env("CLOUDIMG_CONFIG", &config)
        .env("CLOUDIMG_API_URL", &api.base_url)
        .args(args);
    let output = tokio::task::spawn_blocking(move || cmd.output().expect("run"))
        .await
        .expect("join");
    drop(dir);
    output
}

#[tokio::test(flavor = "multi_thread")]
async fn test_image_list_renders_table() {
    let api = FakeApi::spawn(FakeState::default()).await;

    let output = run_logged_in(&api, &["image", "list"]).await;

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ID"));
    assert!(stdout.contains("img-1"));
    assert!(stdout.contains("RESOURCE_PUBLISHED"));
    assert!(stdout.contains("edge"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_image_list_json() {
    let api = FakeApi::spawn(FakeState::default()).await;

    let output = run_logged_in(&api, &["--json", "image", "list"]).await;

    assert!(output.status.success(), "{output:?}");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let images = value["images"].as_array().expect("images array");
    assert_eq!(images.len(), 2);
    assert_eq!(images[1]["status"], "IMAGE_AVAILABLE");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_image_task_waits_through_transient_errors() {
    let api = FakeApi::spawn(FakeState {
        task_failures: 4.into(),
        ..FakeState::default()
    })
    .await;

    let output = run_logged_in(&api, &["--json", "image", "task", "t-7"]).await;

    assert!(output.status.success(), "{output:?}");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["task_id"], "t-7");
    assert_eq!(value["image_id"], "img-9");
    assert_eq!(value["status"], "finished");
}
