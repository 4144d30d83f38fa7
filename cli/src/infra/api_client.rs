//! Infrastructure implementation of the `OAuthApi` and `ImageApi` ports.
//!
//! `RestClient` wraps a single `reqwest::Client` built once per invocation.
//! Idempotent requests (`GET`, the upload `PUT`) go through the shared
//! `RetryPolicy`; `POST`s are sent once.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use cloudimg_common::{
    ApiErrorBody, CreateImageRequest, CreateImageResponse, ImageList, ImageRecord,
    OAuthUrlResponse, TaskStatus, TokenTranslateRequest, Tokens, UploadRequest, UploadSlot,
};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::application::ports::{ImageApi, OAuthApi};
use crate::domain::error::ApiError;
use crate::domain::retry::RetryPolicy;

const SESSION_HEADER: &str = "x-session-id";

/// HTTP client for the image service.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: Url,
    session: Option<Session>,
    retry: RetryPolicy,
}

#[derive(Clone)]
struct Session {
    login_token: String,
    session_id: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Build a client for `base_url`. A trailing slash is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute `http(s)` URL or
    /// the TLS backend cannot be initialised.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid API URL: {base_url}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "invalid API URL: {base_url}"
        );

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cloudimg/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("cannot build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            session: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Attach the session credentials sent on every API request.
    #[must_use]
    pub fn with_tokens(mut self, tokens: &Tokens) -> Self {
        self.session = Some(Session {
            login_token: tokens.login_token.clone(),
            session_id: tokens.session_id.clone(),
        });
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Append `segments` to the base URL. Each segment is percent-encoded,
    /// so an id containing `/`, `?` or `#` stays inside its own segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(ApiError::InvalidId((*bad).to_string()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidId(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn add_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => req
                .bearer_auth(&session.login_token)
                .header(SESSION_HEADER, &session.session_id),
            None => req,
        }
    }

    /// Run `send` until it succeeds, fails permanently, or the retry budget
    /// is spent.
    async fn retrying<T, F, Fut>(&self, what: &str, mut send: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 1;
        loop {
            match send().await {
                Ok(value) => return Ok(value),
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    let delay = self.retry.delay_after(attempt);
                    debug!(
                        request = what,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let url = &url;
        self.retrying(url.path(), || async move {
            debug!(method = "GET", %url, "api request");
            let resp = self
                .add_auth(self.client.get(url.clone()).query(query))
                .send()
                .await
                .map_err(map_network_error)?;
            decode(resp).await
        })
        .await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(method = "POST", %url, "api request");
        let resp = self
            .add_auth(self.client.post(url).json(body))
            .send()
            .await
            .map_err(map_network_error)?;
        decode(resp).await
    }

    async fn post_empty(&self, segments: &[&str]) -> Result<(), ApiError> {
        let url = self.endpoint(segments)?;
        debug!(method = "POST", %url, "api request");
        let resp = self
            .add_auth(self.client.post(url))
            .send()
            .await
            .map_err(map_network_error)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(map_error(resp).await)
        }
    }
}

/// Decode a 2xx JSON body, or map the failure.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    trace!(%status, "api response");
    if !status.is_success() {
        return Err(map_error(resp).await);
    }
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// Map a non-2xx response to an `ApiError`, using the `{code, message}`
/// body when the server sent one.
async fn map_error(resp: Response) -> ApiError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .filter(|m| !m.is_empty())
        .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    debug!(%status, code = ?body.code, "api error response");

    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        s if s.is_server_error() => ApiError::Server {
            status: s.as_u16(),
            message,
        },
        s => ApiError::Rejected {
            status: s.as_u16(),
            code: body.code,
            message,
        },
    }
}

/// Map a reqwest error (network/timeout) to an `ApiError`.
fn map_network_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Network(format!("request timed out: {e}"))
    } else if e.is_connect() {
        ApiError::Network(format!("connection failed: {e}"))
    } else if e.is_decode() {
        ApiError::InvalidResponse(e.to_string())
    } else {
        ApiError::Network(e.to_string())
    }
}

impl OAuthApi for RestClient {
    async fn oauth_url(&self, client_type: &str, port: u16) -> Result<OAuthUrlResponse, ApiError> {
        let port = port.to_string();
        self.get_json(
            &["v1", "oauth", "url"],
            &[("clientType", client_type), ("localhostPort", &port)],
        )
        .await
    }

    async fn translate_token(&self, auth_code: &str, port: u16) -> Result<Tokens, ApiError> {
        self.post_json(
            &["v1", "oauth", "token"],
            &TokenTranslateRequest {
                auth_code: auth_code.to_string(),
                localhost_port: port.to_string(),
            },
        )
        .await
    }
}

impl ImageApi for RestClient {
    async fn list_images(&self) -> Result<Vec<ImageRecord>, ApiError> {
        let list: ImageList = self.get_json(&["v1", "images"], &[]).await?;
        Ok(list.images)
    }

    async fn get_image(&self, image_id: &str) -> Result<ImageRecord, ApiError> {
        let list: ImageList = self
            .get_json(&["v1", "images"], &[("id", image_id)])
            .await?;
        list.images
            .into_iter()
            .find(|i| i.id == image_id)
            .ok_or_else(|| ApiError::NotFound(format!("image {image_id}")))
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ApiError> {
        self.get_json(&["v1", "tasks", task_id], &[]).await
    }

    async fn begin_upload(&self, file_name: &str, size: u64) -> Result<UploadSlot, ApiError> {
        self.post_json(
            &["v1", "images", "uploads"],
            &UploadRequest {
                file_name: file_name.to_string(),
                size,
            },
        )
        .await
    }

    async fn upload(&self, slot: &UploadSlot, body: Vec<u8>) -> Result<(), ApiError> {
        let body = body.as_slice();
        // Pre-signed URL: no API credentials.
        self.retrying("upload", || async move {
            debug!(method = "PUT", upload_id = %slot.upload_id, bytes = body.len(), "upload");
            let resp = self
                .client
                .put(&slot.upload_url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(body.to_vec())
                .send()
                .await
                .map_err(map_network_error)?;
            if resp.status().is_success() {
                Ok(())
            } else {
                Err(map_error(resp).await)
            }
        })
        .await
    }

    async fn create_image(
        &self,
        request: &CreateImageRequest,
    ) -> Result<CreateImageResponse, ApiError> {
        self.post_json(&["v1", "images"], request).await
    }

    async fn activate_image(&self, image_id: &str) -> Result<(), ApiError> {
        self.post_empty(&["v1", "images", image_id, "activate"])
            .await
    }

    async fn deactivate_image(&self, image_id: &str) -> Result<(), ApiError> {
        self.post_empty(&["v1", "images", image_id, "deactivate"])
            .await
    }
}
