//! Full login flow with the real listener, probe and token store; only the
//! OAuth endpoints and the browser are faked.

#![allow(clippy::expect_used)]

use std::cell::RefCell;
use std::net::{Ipv4Addr, TcpListener};
use std::time::Duration;

use cloudimg_cli::application::ports::{BrowserLauncher, OAuthApi, ProgressReporter, TokenStore};
use cloudimg_cli::application::services::login::{LoginPorts, LoginSettings, login};
use cloudimg_cli::domain::error::ApiError;
use cloudimg_cli::infra::callback::AxumCallbackListener;
use cloudimg_cli::infra::port_probe::TcpPortProbe;
use cloudimg_cli::infra::token_store::FileTokenStore;
use cloudimg_common::{OAuthUrlResponse, Tokens};
use url::Url;

use crate::support::{free_port, session_tokens};

/// Mints URLs whose `redirect_uri` targets the requested port.
struct StubOAuth {
    alternates: String,
    requested: RefCell<Vec<u16>>,
    exchanged: RefCell<Vec<(String, u16)>>,
}

impl StubOAuth {
    fn new(alternates: String) -> Self {
        Self {
            alternates,
            requested: RefCell::new(Vec::new()),
            exchanged: RefCell::new(Vec::new()),
        }
    }
}

impl OAuthApi for StubOAuth {
    async fn oauth_url(&self, _client_type: &str, port: u16) -> Result<OAuthUrlResponse, ApiError> {
        self.requested.borrow_mut().push(port);
        Ok(OAuthUrlResponse {
            invocation_url: format!(
                "https://idp.example/authorize?state=s-{port}&redirect_uri=http%3A%2F%2F127.0.0.1%3A{port}%2Fcallback"
            ),
            alternative_ports: self.alternates.clone(),
        })
    }

    async fn translate_token(&self, auth_code: &str, port: u16) -> Result<Tokens, ApiError> {
        self.exchanged
            .borrow_mut()
            .push((auth_code.to_string(), port));
        Ok(session_tokens(1))
    }
}

/// Plays the identity provider: follows `redirect_uri` with a code and the
/// minted state, from a background task.
struct RedirectingBrowser;

impl BrowserLauncher for RedirectingBrowser {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        let url = Url::parse(url)?;
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default()
        };
        let target = format!("{}?code=abc123&state={}", param("redirect_uri"), param("state"));
        tokio::spawn(async move {
            let _ = reqwest::get(target).await;
        });
        Ok(())
    }
}

struct Silent;

impl ProgressReporter for Silent {
    fn step(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}

fn settings(default_port: u16) -> LoginSettings {
    LoginSettings {
        client_type: "cli".to_string(),
        default_port,
        callback_timeout: Duration::from_secs(10),
        open_browser: true,
    }
}

#[tokio::test]
async fn test_login_on_default_port_persists_tokens() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileTokenStore::with_path(dir.path().join("credentials.json"));
    let api = StubOAuth::new(String::new());
    let port = free_port();

    let outcome = login(
        &LoginPorts {
            api: &api,
            listener: &AxumCallbackListener,
            browser: &RedirectingBrowser,
            probe: &TcpPortProbe,
            store: &store,
        },
        &Silent,
        &settings(port),
    )
    .await
    .expect("login");

    assert_eq!(outcome.port, port);
    assert!(outcome.save_error.is_none());
    assert_eq!(*api.requested.borrow(), vec![port]);
    assert_eq!(*api.exchanged.borrow(), vec![("abc123".to_string(), port)]);
    let stored = store.load_tokens().await.expect("load").expect("tokens");
    assert_eq!(stored.session_id, "session-1");
}

#[tokio::test]
async fn test_login_falls_back_when_default_port_is_held() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileTokenStore::with_path(dir.path().join("credentials.json"));
    let held = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
    let default_port = held.local_addr().expect("addr").port();
    let fallback = free_port();
    let api = StubOAuth::new(format!("{fallback}"));

    let outcome = login(
        &LoginPorts {
            api: &api,
            listener: &AxumCallbackListener,
            browser: &RedirectingBrowser,
            probe: &TcpPortProbe,
            store: &store,
        },
        &Silent,
        &settings(default_port),
    )
    .await
    .expect("login");

    assert_eq!(outcome.port, fallback);
    assert_eq!(*api.requested.borrow(), vec![default_port, fallback]);
    assert_eq!(api.exchanged.borrow()[0].1, fallback);
    drop(held);
}
