//! Infrastructure implementation of the `CallbackListener` port.
//!
//! A one-shot axum server on `127.0.0.1:<port>` exposing `GET /callback`,
//! also served on `[::1]:<port>` when the host has IPv6 loopback, since the
//! redirect URI names `localhost`. The first request to `/callback` resolves
//! a oneshot channel; every later request is answered with `409 Conflict`
//! and ignored.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::ports::{CallbackListener, PendingCallback};
use crate::domain::error::AuthError;

/// Time the browser gets to finish loading the result page before the
/// server goes away.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

const SUCCESS_HTML: &str = "<!doctype html><html><head><title>cloudimg</title></head>\
<body><h1>Signed in</h1><p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_HTML: &str = "<!doctype html><html><head><title>cloudimg</title></head>\
<body><h1>Sign-in failed</h1><p>Return to the terminal and run <code>cloudimg login</code> again.</p></body></html>";

const ALREADY_HTML: &str = "<!doctype html><html><head><title>cloudimg</title></head>\
<body><h1>Already handled</h1><p>This sign-in has already been completed.</p></body></html>";

type Outcome = Result<String, AuthError>;

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

struct CallbackState {
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
    expected_state: Option<String>,
}

/// Starts the axum callback server.
#[derive(Debug, Default, Clone, Copy)]
pub struct AxumCallbackListener;

impl CallbackListener for AxumCallbackListener {
    type Pending = PendingAxumCallback;

    async fn bind(
        &self,
        port: u16,
        expected_state: Option<String>,
    ) -> Result<PendingAxumCallback, AuthError> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(|e| AuthError::Listener {
                port,
                reason: e.to_string(),
            })?;
        // Port 0 asks the OS for an ephemeral port.
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Listener {
                port,
                reason: e.to_string(),
            })?
            .port();
        let listener_v6 = bind_v6(port).await?;

        let (result_tx, result_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let state = Arc::new(CallbackState {
            sender: Mutex::new(Some(result_tx)),
            expected_state,
        });
        let router = Router::new()
            .route("/callback", get(handle_callback))
            .with_state(state);

        let dual_stack = listener_v6.is_some();
        let server = tokio::spawn(async move {
            let v4 = serve(listener, router.clone(), shutdown_rx.clone());
            match listener_v6 {
                Some(v6) => {
                    tokio::join!(v4, serve(v6, router, shutdown_rx));
                }
                None => v4.await,
            }
        });
        debug!(port, dual_stack, "callback listener ready");

        Ok(PendingAxumCallback {
            port,
            result: result_rx,
            shutdown: Some(shutdown_tx),
            server: Some(server),
        })
    }
}

/// Bind `[::1]:<port>`. A host without IPv6 loopback gets `None`; a port
/// already taken there is an error like on IPv4.
async fn bind_v6(port: u16) -> Result<Option<TcpListener>, AuthError> {
    match TcpListener::bind((Ipv6Addr::LOCALHOST, port)).await {
        Ok(listener) => Ok(Some(listener)),
        Err(e) if e.kind() == ErrorKind::AddrInUse => Err(AuthError::Listener {
            port,
            reason: e.to_string(),
        }),
        Err(e) => {
            debug!(port, error = %e, "IPv6 loopback unavailable, serving IPv4 only");
            Ok(None)
        }
    }
}

async fn serve(listener: TcpListener, router: Router, mut shutdown: watch::Receiver<()>) {
    let signal = async move {
        // Resolves on an explicit shutdown or when the sender is dropped.
        let _ = shutdown.changed().await;
    };
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await
    {
        warn!(error = %e, "callback server error");
    }
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<&'static str>) {
    let Some(sender) = state.sender.lock().await.take() else {
        debug!("callback already handled, ignoring request");
        return (StatusCode::CONFLICT, Html(ALREADY_HTML));
    };

    let outcome = evaluate(params, state.expected_state.as_deref());
    let response = match &outcome {
        Ok(_) => (StatusCode::OK, Html(SUCCESS_HTML)),
        Err(e) => {
            warn!(error = %e, "rejected login callback");
            (StatusCode::BAD_REQUEST, Html(FAILURE_HTML))
        }
    };
    // The waiter may already have given up.
    let _ = sender.send(outcome);
    response
}

fn evaluate(params: CallbackParams, expected_state: Option<&str>) -> Outcome {
    if let Some(expected) = expected_state
        && params.state.as_deref() != Some(expected)
    {
        return Err(AuthError::StateMismatch);
    }
    match params.code {
        Some(code) if !code.is_empty() => Ok(code),
        _ => Err(AuthError::MissingCode {
            provider_error: params.error,
        }),
    }
}

/// A bound callback server awaiting its single request.
///
/// Dropping it before `wait` completes aborts the server and frees the port.
#[derive(Debug)]
pub struct PendingAxumCallback {
    port: u16,
    result: oneshot::Receiver<Outcome>,
    shutdown: Option<watch::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl PendingAxumCallback {
    /// Stop accepting now and wait for the server task to exit.
    async fn close_now(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
            let _ = server.await;
        }
        self.shutdown = None;
    }

    /// Shut down gracefully after `grace`, in the background.
    fn close_after(&mut self, grace: Duration) {
        let shutdown = self.shutdown.take();
        let Some(mut server) = self.server.take() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(tx) = shutdown {
                let _ = tx.send(());
            }
            if tokio::time::timeout(grace, &mut server).await.is_err() {
                server.abort();
            }
        });
    }
}

impl PendingCallback for PendingAxumCallback {
    fn port(&self) -> u16 {
        self.port
    }

    async fn wait(mut self, deadline: Duration) -> Result<String, AuthError> {
        match tokio::time::timeout(deadline, &mut self.result).await {
            Ok(Ok(outcome)) => {
                if outcome.is_ok() {
                    info!(port = self.port, "login callback received");
                }
                self.close_after(SHUTDOWN_GRACE);
                outcome
            }
            Ok(Err(_)) => {
                self.close_now().await;
                Err(AuthError::Listener {
                    port: self.port,
                    reason: "callback server stopped unexpectedly".to_string(),
                })
            }
            Err(_) => {
                warn!(
                    port = self.port,
                    timeout_secs = deadline.as_secs(),
                    "no login callback before deadline"
                );
                self.close_now().await;
                Err(AuthError::Timeout)
            }
        }
    }
}

impl Drop for PendingAxumCallback {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}
