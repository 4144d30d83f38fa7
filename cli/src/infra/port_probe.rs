//! Infrastructure implementation of the `PortProbe` port.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, TcpListener};

use crate::application::ports::PortProbe;

/// Probes a port by binding `127.0.0.1:<port>` and `[::1]:<port>` and
/// releasing both at once. A host without IPv6 loopback only needs IPv4.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpPortProbe;

impl PortProbe for TcpPortProbe {
    fn is_free(&self, port: u16) -> bool {
        let Ok(_v4) = TcpListener::bind((Ipv4Addr::LOCALHOST, port)) else {
            return false;
        };
        match TcpListener::bind((Ipv6Addr::LOCALHOST, port)) {
            Ok(_) => true,
            Err(e) => e.kind() != ErrorKind::AddrInUse,
        }
    }
}
