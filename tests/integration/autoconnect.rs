//! Auto-connect lifecycle integration tests.
//!
//! A small driver plays the logic thread: it feeds ticks to the session
//! and carries out the steps it asks for against a scripted target,
//! synchronously, so whole connect/ping/retry cycles can be checked.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use vxconsole::autoconnect::{Notice, State, Step};
use vxconsole::config::Config;
use vxconsole::remote::{
    Notification, NotificationSink, RemoteClient, ScriptedTransport, Transport,
};
use vxconsole::{ConnectionState, Session};

use crate::fixtures::sink;

struct Driver {
    session: Session,
    client: RemoteClient,
    transport: Arc<ScriptedTransport>,
    sink: NotificationSink,
    notifications: Receiver<Notification>,
    notices: Vec<Notice>,
    attempts: usize,
    pings: usize,
}

impl Driver {
    fn new(config: Config, transport: ScriptedTransport) -> Self {
        let transport = Arc::new(transport);
        let (sink, notifications) = sink();
        Self {
            session: Session::new(&config),
            client: RemoteClient::new(transport.clone()),
            transport,
            sink,
            notifications,
            notices: Vec::new(),
            attempts: 0,
            pings: 0,
        }
    }

    fn apply(&mut self, steps: Vec<Step>) {
        for step in steps {
            match step {
                Step::Connect => {
                    self.attempts += 1;
                    let outcome = self.client.listen(self.session.target(), self.sink.clone());
                    let next = self.session.on_listen(&outcome);
                    self.apply(next);
                }
                Step::Ping => {
                    self.pings += 1;
                    let outcome = self.client.ping();
                    let next = self.session.on_ping(&outcome);
                    self.apply(next);
                }
                Step::Discard => self.client.disconnect(),
                Step::Notice(notice) => self.notices.push(notice),
            }
        }
    }

    fn enable(&mut self) {
        let steps = self.session.enable_auto_connect();
        self.apply(steps);
    }

    fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            let steps = self.session.tick();
            self.apply(steps);
        }
    }

    fn drain(&mut self) {
        while let Ok(n) = self.notifications.try_recv() {
            self.session.handle_notification(n);
        }
    }
}

fn quick_config() -> Config {
    Config {
        ping_ticks: 2,
        retry_ticks: 3,
        boot_ticks: 5,
        ..Config::default()
    }
}

/// Test: Connect, then ping on schedule
/// Given a reachable target with its application running
/// When auto-connect is enabled and the timer runs
/// Then the session attaches at once and pings every `ping_ticks`
#[test]
fn test_session_pings_on_schedule() {
    let mut driver = Driver::new(quick_config(), ScriptedTransport::new());
    driver.enable();
    assert_eq!(driver.attempts, 1);
    assert_eq!(driver.session.connection(), ConnectionState::ConnectedWithSession);
    assert_eq!(
        driver.session.autoconnect().state(),
        State::SessionActive { next_ping: 2 }
    );

    driver.ticks(1);
    assert_eq!(driver.pings, 0);
    driver.ticks(1);
    assert_eq!(driver.pings, 1);
    driver.ticks(4);
    assert_eq!(driver.pings, 3);
    assert!(driver.notices.is_empty());
}

/// Test: Losing the link reconnects
/// Given an active session
/// When the target stops answering and a ping fails
/// Then the connection is reported lost and a new attempt starts straight away
#[test]
fn test_lost_ping_triggers_reconnect() {
    let mut driver = Driver::new(quick_config(), ScriptedTransport::new());
    driver.enable();

    driver.transport.set_reachable(false);
    driver.ticks(2);

    assert_eq!(driver.pings, 1);
    assert_eq!(driver.attempts, 2);
    assert_eq!(driver.notices, vec![Notice::ConnectionLost, Notice::Waiting]);
    assert_eq!(driver.session.connection(), ConnectionState::Disconnected);
    assert_eq!(
        driver.session.autoconnect().state(),
        State::Backoff { remaining: 5 }
    );
}

/// Test: First failure waits for boot, second gives up
/// Given an unreachable target
/// When auto-connect is enabled
/// Then it counts down `boot_ticks`, retries once, and then disables itself
#[test]
fn test_unreachable_target_gives_up_after_second_failure() {
    let transport = ScriptedTransport::new();
    transport.set_reachable(false);
    let mut driver = Driver::new(quick_config(), transport);

    driver.enable();
    assert_eq!(driver.notices, vec![Notice::Waiting]);

    driver.ticks(4);
    assert_eq!(driver.attempts, 1);
    driver.ticks(1);
    assert_eq!(driver.attempts, 2);
    assert_eq!(
        driver.notices,
        vec![
            Notice::Waiting,
            Notice::Remaining { seconds: 4 },
            Notice::Remaining { seconds: 3 },
            Notice::Remaining { seconds: 2 },
            Notice::Remaining { seconds: 1 },
            Notice::GaveUp,
        ]
    );
    assert!(!driver.session.autoconnect().is_enabled());
    assert_eq!(driver.session.autoconnect().state(), State::Idle);

    // Nothing further happens on its own.
    driver.ticks(20);
    assert_eq!(driver.attempts, 2);
}

/// Test: Target comes up during the boot wait
#[test]
fn test_target_boots_during_wait() {
    let transport = ScriptedTransport::new();
    transport.set_reachable(false);
    let mut driver = Driver::new(quick_config(), transport);

    driver.enable();
    driver.transport.set_reachable(true);
    driver.ticks(5);

    assert_eq!(driver.attempts, 2);
    assert_eq!(driver.session.connection(), ConnectionState::ConnectedWithSession);
    assert_eq!(driver.notices.first(), Some(&Notice::Waiting));
    assert_eq!(driver.notices.last(), Some(&Notice::Remaining { seconds: 1 }));
    assert_eq!(driver.notices.len(), 5);
}

/// Test: Transport without application keeps polling
/// Given a target whose application is not running
/// When auto-connect runs
/// Then it settles on transport-only and retries every `retry_ticks`
/// until the application starts
#[test]
fn test_transport_only_retries_until_application_starts() {
    let transport = ScriptedTransport::new();
    transport.set_app_running(false);
    let mut driver = Driver::new(quick_config(), transport);

    driver.enable();
    assert_eq!(driver.session.connection(), ConnectionState::ConnectedTransportOnly);

    driver.ticks(3);
    assert_eq!(driver.attempts, 2);
    assert_eq!(driver.session.connection(), ConnectionState::ConnectedTransportOnly);

    driver.transport.set_app_running(true);
    driver.ticks(3);
    assert_eq!(driver.attempts, 3);
    assert_eq!(driver.session.connection(), ConnectionState::ConnectedWithSession);
    assert_eq!(driver.session.connect_count(), 1);
    assert!(driver.notices.is_empty());
}

/// Test: Reconnect replaces the remote command table
/// Given a session whose target announced commands
/// When the connection is lost and re-established
/// Then only the commands announced on the new session are known
#[test]
fn test_reconnect_starts_fresh_command_table() {
    let transport = ScriptedTransport::new();
    transport.on_session(r#"XCMD!AddCommands() "god" "Toggle""#);
    let mut driver = Driver::new(quick_config(), transport);

    driver.enable();
    driver.drain();
    assert_eq!(driver.session.registry().remote_len(), 1);

    driver.transport.set_reachable(false);
    driver.ticks(2);
    assert_eq!(driver.session.registry().remote_len(), 0);

    driver.transport.set_reachable(true);
    driver.ticks(5);
    driver.drain();
    assert_eq!(driver.session.connect_count(), 2);
    assert_eq!(driver.session.registry().remote_len(), 1);
}

/// Test: User disconnect stops everything
#[test]
fn test_user_disconnect_disables_timer() {
    let mut driver = Driver::new(quick_config(), ScriptedTransport::new());
    driver.enable();

    driver.session.user_disconnect();
    driver.client.disconnect();
    assert!(!driver.transport.is_connected());

    driver.ticks(10);
    assert_eq!(driver.attempts, 1);
    assert_eq!(driver.pings, 0);
}

/// Test: Target-initiated disconnect backs off before reconnecting
#[test]
fn test_remote_disconnect_backs_off() {
    let mut driver = Driver::new(quick_config(), ScriptedTransport::new());
    driver.enable();

    driver.session.on_remote_disconnect();
    assert_eq!(
        driver.session.autoconnect().state(),
        State::Backoff { remaining: 3 }
    );
    driver.ticks(2);
    assert_eq!(driver.attempts, 1);
    driver.ticks(1);
    assert_eq!(driver.attempts, 2);
    assert_eq!(driver.session.connection(), ConnectionState::ConnectedWithSession);
}
