//! The axum callback listener on real sockets.

#![allow(clippy::expect_used)]

use std::net::{Ipv4Addr, Ipv6Addr, TcpListener};
use std::time::Duration;

use cloudimg_cli::application::ports::{CallbackListener, PendingCallback};
use cloudimg_cli::domain::error::AuthError;
use cloudimg_cli::infra::callback::AxumCallbackListener;

async fn get_status(port: u16, query: &str) -> u16 {
    reqwest::get(format!("http://127.0.0.1:{port}/callback{query}"))
        .await
        .expect("request")
        .status()
        .as_u16()
}

#[tokio::test]
async fn test_code_is_delivered_and_success_page_served() {
    let pending = AxumCallbackListener.bind(0, None).await.expect("bind");
    let port = pending.port();
    assert_ne!(port, 0);

    let response = reqwest::get(format!("http://127.0.0.1:{port}/callback?code=abc123"))
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.expect("body");
    assert!(body.contains("Signed in"));

    let code = pending.wait(Duration::from_secs(5)).await.expect("code");
    assert_eq!(code, "abc123");
}

#[tokio::test]
async fn test_missing_code_is_rejected() {
    let pending = AxumCallbackListener.bind(0, None).await.expect("bind");
    let port = pending.port();

    assert_eq!(get_status(port, "?error=access_denied").await, 400);

    let err = pending
        .wait(Duration::from_secs(5))
        .await
        .expect_err("no code");
    match err {
        AuthError::MissingCode { provider_error } => {
            assert_eq!(provider_error.as_deref(), Some("access_denied"));
        }
        other => panic!("expected MissingCode, got {other:?}"),
    }
}

#[tokio::test]
async fn test_state_mismatch_is_rejected() {
    let pending = AxumCallbackListener
        .bind(0, Some("s1".to_string()))
        .await
        .expect("bind");
    let port = pending.port();

    assert_eq!(get_status(port, "?code=abc&state=forged").await, 400);

    let err = pending
        .wait(Duration::from_secs(5))
        .await
        .expect_err("mismatch");
    assert!(matches!(err, AuthError::StateMismatch));
}

#[tokio::test]
async fn test_only_first_request_is_captured() {
    let pending = AxumCallbackListener.bind(0, None).await.expect("bind");
    let port = pending.port();

    let (a, b) = tokio::join!(
        get_status(port, "?code=first"),
        get_status(port, "?code=second")
    );
    let mut statuses = vec![a, b];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![200, 409]);

    let code = pending.wait(Duration::from_secs(5)).await.expect("code");
    assert!(code == "first" || code == "second", "got {code}");
}

#[tokio::test]
async fn test_other_paths_are_not_found() {
    let pending = AxumCallbackListener.bind(0, None).await.expect("bind");
    let port = pending.port();

    let status = reqwest::get(format!("http://127.0.0.1:{port}/favicon.ico"))
        .await
        .expect("request")
        .status()
        .as_u16();
    assert_eq!(status, 404);

    // The stray request did not consume the callback.
    assert_eq!(get_status(port, "?code=abc").await, 200);
    assert_eq!(
        pending.wait(Duration::from_secs(5)).await.expect("code"),
        "abc"
    );
}

#[tokio::test]
async fn test_timeout_releases_port() {
    let pending = AxumCallbackListener.bind(0, None).await.expect("bind");
    let port = pending.port();

    let err = pending
        .wait(Duration::from_millis(100))
        .await
        .expect_err("nobody called back");
    assert!(matches!(err, AuthError::Timeout));
    assert_eq!(err.to_string(), "Authentication timeout: please try again");

    TcpListener::bind((Ipv4Addr::LOCALHOST, port)).expect("port is free again");
}

#[tokio::test]
async fn test_busy_port_fails_to_bind() {
    let held = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
    let port = held.local_addr().expect("addr").port();

    let err = AxumCallbackListener
        .bind(port, None)
        .await
        .expect_err("port is held");
    assert!(matches!(err, AuthError::Listener { port: p, .. } if p == port));
}

#[tokio::test]
async fn test_server_stops_after_grace_period() {
    let pending = AxumCallbackListener.bind(0, None).await.expect("bind");
    let port = pending.port();

    // Fresh client so no pooled connection outlives the server.
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .expect("client");
    let status = client
        .get(format!("http://127.0.0.1:{port}/callback?code=abc"))
        .send()
        .await
        .expect("request")
        .status();
    assert_eq!(status.as_u16(), 200);
    pending.wait(Duration::from_secs(5)).await.expect("code");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(
        client
            .get(format!("http://127.0.0.1:{port}/callback?code=again"))
            .send()
            .await
            .is_err(),
        "server should be gone after the grace period"
    );
}

#[tokio::test]
async fn test_callback_is_reachable_over_ipv6_loopback() {
    if TcpListener::bind((Ipv6Addr::LOCALHOST, 0)).is_err() {
        return; // no IPv6 loopback on this host
    }
    let pending = AxumCallbackListener.bind(0, None).await.expect("bind");
    let port = pending.port();

    let status = reqwest::get(format!("http://[::1]:{port}/callback?code=v6code"))
        .await
        .expect("request")
        .status();
    assert_eq!(status.as_u16(), 200);
    assert_eq!(get_status(port, "?code=late").await, 409);

    let code = pending.wait(Duration::from_secs(5)).await.expect("code");
    assert_eq!(code, "v6code");
}

#[tokio::test]
async fn test_port_held_on_ipv6_loopback_is_a_listener_error() {
    let Ok(held) = TcpListener::bind((Ipv6Addr::LOCALHOST, 0)) else {
        return;
    };
    let port = held.local_addr().expect("addr").port();
    if TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_err() {
        return; // IPv4 side taken by someone else
    }

    let err = AxumCallbackListener
        .bind(port, None)
        .await
        .expect_err("port taken on ::1");
    assert!(matches!(err, AuthError::Listener { port: p, .. } if p == port));
}
