//! Callback port parsing.
//!
//! Pure functions only — the bind test lives behind the `PortProbe` port.

/// Parse a single port string: ASCII digits only, within 1–65535.
#[must_use]
pub fn parse_port(raw: &str) -> Option<u16> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match raw.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

/// Parse the server-supplied comma-separated alternate port list.
///
/// Malformed entries are dropped and order is preserved.
#[must_use]
pub fn parse_alternate_ports(csv: &str) -> Vec<u16> {
    csv.split(',').filter_map(parse_port).collect()
}
