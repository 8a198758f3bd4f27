//! Single-flight gate integration tests.
//!
//! These tests run real threads against a slow scripted target to verify
//! that only one request is ever on the wire, that pings never wait, and
//! that the gate reopens however a request ends.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio_test::assert_ok;

use vxconsole::remote::{PingOutcome, RemoteClient, RequestGate, ScriptedTransport, Transport};
use vxconsole::Error;

const SLOW: Duration = Duration::from_millis(200);

fn slow_client() -> (Arc<ScriptedTransport>, RemoteClient) {
    let transport = Arc::new(ScriptedTransport::new());
    assert_ok!(transport.connect("devkit"));
    transport.set_delay(Some(SLOW));
    let client = RemoteClient::new(transport.clone());
    (transport, client)
}

/// Wait until the client's gate closes, so a request is known to be in flight.
fn wait_busy(gate: &RequestGate) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !gate.is_busy() {
        assert!(Instant::now() < deadline, "request never started");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Test: Ping during a request reports Busy
/// Given a request in flight on a slow target
/// When a ping is attempted
/// Then it returns Busy at once without touching the wire
#[test]
fn test_ping_during_request_is_busy() {
    let (transport, client) = slow_client();
    let worker = {
        let client = client.clone();
        thread::spawn(move || client.send_command("XCMD!status", true))
    };
    wait_busy(client.gate());

    let start = Instant::now();
    assert_eq!(client.ping(), PingOutcome::Busy);
    assert!(start.elapsed() < SLOW / 2, "ping waited for the gate");

    assert_ok!(worker.join().unwrap());
    assert_eq!(transport.sent(), vec!["XCMD!status"]);
    assert!(!client.gate().is_busy());
}

/// Test: Blocking requests queue behind each other
/// Given a request in flight
/// When a second caller sends with wait
/// Then it runs after the first, never alongside it
#[test]
fn test_waiting_requests_are_serialized() {
    let (transport, client) = slow_client();
    let start = Instant::now();
    let first = {
        let client = client.clone();
        thread::spawn(move || client.send_command("*systime", true))
    };
    wait_busy(client.gate());

    let second = {
        let client = client.clone();
        thread::spawn(move || client.send_command("*threads", true))
    };
    assert_ok!(first.join().unwrap());
    assert_ok!(second.join().unwrap());

    assert!(start.elapsed() >= SLOW * 2, "second request overlapped the first");
    assert_eq!(transport.sent(), vec!["systime", "threads"]);
}

/// Test: Non-waiting sends fail fast while busy
#[test]
fn test_no_wait_send_fails_fast() {
    let (_transport, client) = slow_client();
    let worker = {
        let client = client.clone();
        thread::spawn(move || client.send_command("*go", true))
    };
    wait_busy(client.gate());

    assert!(matches!(
        client.send_command("*stop", false),
        Err(Error::TransportBusy)
    ));
    assert_ok!(worker.join().unwrap());
}

/// Test: The gate reopens after a failed request
/// Given a target that dropped the link
/// When a request fails
/// Then the next request can still take the gate
#[test]
fn test_gate_reopens_after_failure() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = RemoteClient::new(transport.clone());

    assert!(matches!(
        client.send_command("*systime", true),
        Err(Error::NotConnected)
    ));
    assert!(!client.gate().is_busy());

    assert_ok!(transport.connect("devkit"));
    assert_ok!(client.send_command("*systime", true));
}

/// Test: Many concurrent callers, one request at a time
#[test]
fn test_concurrent_callers_all_complete() {
    let transport = Arc::new(ScriptedTransport::new());
    assert_ok!(transport.connect("devkit"));
    transport.set_delay(Some(Duration::from_millis(5)));
    let client = RemoteClient::new(transport.clone());

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            thread::spawn(move || client.send_command(&format!("XCMD!echo {}", i), true))
        })
        .collect();
    for worker in workers {
        assert_ok!(worker.join().unwrap());
    }

    let mut sent = transport.sent();
    sent.sort();
    let expected: Vec<String> = (0..8).map(|i| format!("XCMD!echo {}", i)).collect();
    assert_eq!(sent, expected);
}
