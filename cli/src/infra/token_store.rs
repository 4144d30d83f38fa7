//! Infrastructure implementation of the `TokenStore` port.
//!
//! `FileTokenStore` keeps the session tokens in a JSON file and performs all
//! file I/O through `tokio::task::spawn_blocking`. Writes go to a fresh
//! owner-only temp file in the same directory, which is then renamed over
//! the credentials file.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cloudimg_common::Tokens;

use crate::application::ports::TokenStore;
use crate::domain::error::AuthError;

/// Credentials file manager.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store at `~/.cloudimg/credentials.json`, or at
    /// `CLOUDIMG_CREDENTIALS` when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        if let Ok(val) = std::env::var("CLOUDIMG_CREDENTIALS") {
            return Ok(Self::with_path(PathBuf::from(val)));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(home.join(".cloudimg").join("credentials.json")))
    }

    /// Create a store with an explicit path (used in tests).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn load_sync(&self) -> Result<Option<Tokens>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading credentials {}", self.path.display()))?;
        let tokens: Tokens = serde_json::from_str(&content)
            .with_context(|| format!("parsing credentials {}", self.path.display()))?;
        Ok(Some(tokens))
    }

    fn save_sync(&self, tokens: &Tokens) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
        let content = serde_json::to_string_pretty(tokens).context("serializing credentials")?;

        // Created 0600 with a unique name; removed on drop if anything below fails.
        let mut temp = tempfile::Builder::new()
            .prefix(".credentials")
            .suffix(".tmp")
            .tempfile_in(parent)
            .with_context(|| format!("creating temp file in {}", parent.display()))?;
        temp.write_all(content.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .with_context(|| format!("writing temp file {}", temp.path().display()))?;

        temp.persist(&self.path)
            .with_context(|| format!("finalizing credentials {}", self.path.display()))?;
        Ok(())
    }

    fn clear_sync(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("removing credentials {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Load tokens that are present and not yet expired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotLoggedIn` when nothing is stored and
    /// `AuthError::SessionExpired` when the stored login token has expired.
    pub async fn require_session(&self) -> Result<Tokens> {
        match self.load_tokens().await? {
            None => Err(AuthError::NotLoggedIn.into()),
            Some(tokens) if tokens.is_expired(chrono::Utc::now()) => {
                Err(AuthError::SessionExpired.into())
            }
            Some(tokens) => Ok(tokens),
        }
    }
}

impl TokenStore for FileTokenStore {
    async fn load_tokens(&self) -> Result<Option<Tokens>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load_sync())
            .await
            .context("credentials load task panicked")?
    }

    async fn save_tokens(&self, tokens: &Tokens) -> Result<()> {
        let store = self.clone();
        let tokens = tokens.clone();
        tokio::task::spawn_blocking(move || store.save_sync(&tokens))
            .await
            .context("credentials save task panicked")?
    }

    async fn clear_tokens(&self) -> Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.clear_sync())
            .await
            .context("credentials clear task panicked")?
    }
}
