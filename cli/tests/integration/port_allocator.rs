//! Port selection against real sockets.

#![allow(clippy::expect_used)]

use std::net::{Ipv4Addr, TcpListener};

use cloudimg_cli::application::services::port_allocator::select_port;
use cloudimg_cli::domain::error::AuthError;
use cloudimg_cli::infra::port_probe::TcpPortProbe;

use crate::support::free_port;

fn hold() -> (TcpListener, u16) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
    let port = listener.local_addr().expect("addr").port();
    (listener, port)
}

#[test]
fn test_free_default_port_is_used() {
    let port = free_port();
    assert_eq!(select_port(&TcpPortProbe, port, "1,2").expect("port"), port);
}

#[test]
fn test_busy_default_falls_back_to_first_free_alternate() {
    let (_default, default_port) = hold();
    let (_alt, busy_alt) = hold();
    let free_alt = free_port();

    let csv = format!("{busy_alt},garbage,{free_alt}");
    assert_eq!(
        select_port(&TcpPortProbe, default_port, &csv).expect("port"),
        free_alt
    );
}

#[test]
fn test_all_busy_reports_every_attempt() {
    let (_default, default_port) = hold();
    let (_a, a) = hold();
    let (_b, b) = hold();

    let err = select_port(&TcpPortProbe, default_port, &format!("{a},{b}"))
        .expect_err("nothing free");
    match err {
        AuthError::NoPortAvailable { attempted } => assert_eq!(attempted, vec![default_port, a, b]),
        other => panic!("expected NoPortAvailable, got {other:?}"),
    }
}
