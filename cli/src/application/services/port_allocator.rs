//! Application service — callback port selection.

use tracing::{debug, info};

use crate::application::ports::PortProbe;
use crate::domain::error::AuthError;
use crate::domain::port::parse_alternate_ports;

/// Pick the port the OAuth callback listener should bind.
///
/// Returns `default_port` when it is free. Otherwise probes the alternates
/// from `alternates_csv` in order and returns the first free one. The probe is
/// a bind-and-release test, so the answer can go stale before the listener
/// binds; the caller binds immediately afterwards.
///
/// # Errors
///
/// Returns `AuthError::NoPortAvailable` listing every probed port when none
/// is free.
pub fn select_port(
    probe: &impl PortProbe,
    default_port: u16,
    alternates_csv: &str,
) -> Result<u16, AuthError> {
    if probe.is_free(default_port) {
        debug!(port = default_port, "default callback port is free");
        return Ok(default_port);
    }

    let mut attempted = vec![default_port];
    for port in parse_alternate_ports(alternates_csv) {
        if attempted.contains(&port) {
            continue;
        }
        attempted.push(port);
        if probe.is_free(port) {
            info!(
                default = default_port,
                port, "default callback port in use, using alternate"
            );
            return Ok(port);
        }
    }

    Err(AuthError::NoPortAvailable { attempted })
}
