//! OAuth callback helpers.

use url::Url;

/// Extract the `state` parameter the server minted into the invocation URL.
///
/// Returns `None` when the URL cannot be parsed or carries no non-empty
/// `state`, in which case the callback's `state` is not checked.
#[must_use]
pub fn expected_state(invocation_url: &str) -> Option<String> {
    let url = Url::parse(invocation_url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Local redirect target for a callback port.
#[must_use]
pub fn callback_url(port: u16) -> String {
    format!("http://localhost:{port}/callback")
}
