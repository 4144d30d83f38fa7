//! Infrastructure implementation of the `BrowserLauncher` port.

use anyhow::{Context, Result};

use crate::application::ports::BrowserLauncher;

/// Opens URLs with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        open::that(url).context("cannot launch browser")
    }
}
