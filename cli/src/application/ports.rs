//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared wire types —
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use cloudimg_common::{
    CreateImageRequest, CreateImageResponse, ImageRecord, OAuthUrlResponse, TaskStatus, Tokens,
    UploadSlot,
};

use crate::domain::config::CliConfig;
use crate::domain::error::{ApiError, AuthError};

// ── Remote API Ports ──────────────────────────────────────────────────────────

/// OAuth endpoints of the image service.
#[allow(async_fn_in_trait)]
pub trait OAuthApi {
    /// Request a browser invocation URL whose redirect targets `port`.
    async fn oauth_url(&self, client_type: &str, port: u16) -> Result<OAuthUrlResponse, ApiError>;

    /// Exchange an authorization code for session tokens. `port` must be the
    /// port the code was delivered to.
    async fn translate_token(&self, auth_code: &str, port: u16) -> Result<Tokens, ApiError>;
}

/// Image and task endpoints of the image service.
#[allow(async_fn_in_trait)]
pub trait ImageApi {
    async fn list_images(&self) -> Result<Vec<ImageRecord>, ApiError>;

    /// Fetch one image by id. An empty result maps to `ApiError::NotFound`.
    async fn get_image(&self, image_id: &str) -> Result<ImageRecord, ApiError>;

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ApiError>;

    /// Reserve an upload location for an artifact of `size` bytes.
    async fn begin_upload(&self, file_name: &str, size: u64) -> Result<UploadSlot, ApiError>;

    /// Send the artifact bytes to a reserved upload location.
    async fn upload(&self, slot: &UploadSlot, body: Vec<u8>) -> Result<(), ApiError>;

    async fn create_image(
        &self,
        request: &CreateImageRequest,
    ) -> Result<CreateImageResponse, ApiError>;

    async fn activate_image(&self, image_id: &str) -> Result<(), ApiError>;

    async fn deactivate_image(&self, image_id: &str) -> Result<(), ApiError>;
}

// ── Login Ports ───────────────────────────────────────────────────────────────

/// Checks whether a local TCP port can be bound right now.
pub trait PortProbe {
    fn is_free(&self, port: u16) -> bool;
}

/// Starts the local OAuth callback listener.
#[allow(async_fn_in_trait)]
pub trait CallbackListener {
    type Pending: PendingCallback;

    /// Bind `localhost:<port>` and start serving `/callback`.
    ///
    /// Returns only once the socket is accepting connections, so the browser
    /// can be launched immediately afterwards. When `expected_state` is set,
    /// a callback with a different `state` is rejected.
    async fn bind(
        &self,
        port: u16,
        expected_state: Option<String>,
    ) -> Result<Self::Pending, AuthError>;
}

/// A bound listener waiting for its single callback.
#[allow(async_fn_in_trait)]
pub trait PendingCallback {
    /// Port the listener is bound to.
    fn port(&self) -> u16;

    /// Wait for the callback or the deadline, whichever comes first, then
    /// release the socket. Returns the authorization code.
    async fn wait(self, deadline: Duration) -> Result<String, AuthError>;
}

/// Opens a URL in the user's default browser.
pub trait BrowserLauncher {
    /// # Errors
    ///
    /// Returns an error if no browser could be launched. Callers treat this
    /// as non-fatal and show the URL instead.
    fn open(&self, url: &str) -> Result<()>;
}

// ── Persistence Ports ─────────────────────────────────────────────────────────

/// Persistence of the session tokens.
#[allow(async_fn_in_trait)]
pub trait TokenStore {
    /// Load stored tokens, returning `None` if the user is logged out.
    async fn load_tokens(&self) -> Result<Option<Tokens>>;
    async fn save_tokens(&self, tokens: &Tokens) -> Result<()>;
    /// Remove stored tokens. Succeeds when nothing is stored.
    async fn clear_tokens(&self) -> Result<()>;
}

/// Abstracts configuration persistence (load/save).
pub trait ConfigStore {
    /// Load the configuration, returning defaults when no file exists.
    fn load(&self) -> Result<CliConfig>;
    fn save(&self, config: &CliConfig) -> Result<()>;
    /// Path of the backing file.
    fn path(&self) -> Result<PathBuf>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Report the latest status observed while polling.
    fn status(&self, _message: &str) {}
}
