//! Console line dispatch integration tests.
//!
//! These tests verify that a typed line reaches the right handler for
//! each connection state, once the target has announced its commands.

use tokio_test::{assert_err, assert_ok};

use vxconsole::config::Config;
use vxconsole::dispatch::{split_first, tokenize, LocalAction, Route, LOCAL_COMMANDS};
use vxconsole::remote::{classify, ListenOutcome};
use vxconsole::{ConnectionState, Error, Session};

use crate::fixtures::{attached_session, info};

fn announce(session: &mut Session, raw: &str) {
    let handled = session.handle_notification(classify(raw));
    assert_eq!(handled.ack, Some(0), "announcement should be acked with 0");
}

/// Test: Announced commands become dispatchable
/// Given a session with its application attached
/// When the target announces `map` and `god`
/// Then typing them forwards the whole line behind the routing prefix
#[test]
fn test_announced_commands_forward_with_prefix() {
    let mut session = attached_session();
    announce(
        &mut session,
        r#"XCMD!AddCommands() "map" "<name> : Load a map" "god" ": Toggle""#,
    );

    let route = assert_ok!(session.resolve("  map c1a0  "));
    assert_eq!(
        route,
        Some(Route::Forward {
            wire: "XCMD!map c1a0".to_string()
        })
    );

    // Lookup ignores case; the wire keeps what the user typed.
    let route = assert_ok!(session.resolve("GOD"));
    assert_eq!(
        route,
        Some(Route::Forward {
            wire: "XCMD!GOD".to_string()
        })
    );
}

/// Test: Local commands shadow remote ones
/// Given a target that announces a command named `*cls`
/// When the user types `*cls`
/// Then the built-in runs and the remote entry is never consulted
#[test]
fn test_local_shadows_remote() {
    let mut session = attached_session();
    announce(&mut session, r#"XCMD!AddCommands() "*cls" "remote clear""#);

    let route = assert_ok!(session.resolve("*cls"));
    assert!(matches!(
        route,
        Some(Route::Local {
            action: LocalAction::Cls,
            ..
        })
    ));
}

/// Test: Remote commands vanish with the session
/// Given announced commands
/// When the connection drops to transport-only
/// Then the commands are unknown again
#[test]
fn test_remote_commands_cleared_on_downgrade() {
    let mut session = attached_session();
    announce(&mut session, r#"XCMD!AddCommands() "noclip" "fly""#);
    assert_eq!(session.registry().remote_len(), 1);

    // Reconnect; this time only the transport answers.
    session.user_disconnect();
    session.enable_auto_connect();
    session.on_listen(&ListenOutcome::TransportOnly(info()));

    assert_eq!(session.connection(), ConnectionState::ConnectedTransportOnly);
    assert_eq!(session.registry().remote_len(), 0);
    let err = assert_err!(session.resolve("noclip"));
    assert!(matches!(err, Error::UnknownCommand(name) if name == "noclip"));
}

/// Test: Completion after a disconnect offers only local commands
/// Given a session whose target announced commands
/// When the user disconnects
/// Then completing an empty line lists exactly the local table, sorted
#[test]
fn test_completion_after_disconnect_is_local_only() {
    let mut session = attached_session();
    announce(&mut session, r#"XCMD!AddCommands() "noclip" "fly" "map" "load""#);
    session.user_disconnect();

    let mut local: Vec<String> = LOCAL_COMMANDS.iter().map(|c| c.name.to_string()).collect();
    local.sort_by_key(|name| name.to_ascii_lowercase());
    assert_eq!(session.hints("", usize::MAX), local);
}

/// Test: Availability follows the connection state
/// Given each of the three connection states
/// When `*memory` (needs the application) and `*systime` (needs the link) are typed
/// Then each is refused with NotYetAvailable until its requirement is met
#[test]
fn test_availability_per_connection_state() {
    let disconnected = Session::new(&Config::default());
    let err = assert_err!(disconnected.resolve("*systime"));
    assert!(matches!(err, Error::NotYetAvailable { .. }));
    let err = assert_err!(disconnected.resolve("*memory"));
    assert!(matches!(err, Error::NotYetAvailable { requirement: "Application", .. }));

    let mut transport_only = Session::new(&Config::default());
    transport_only.enable_auto_connect();
    transport_only.on_listen(&ListenOutcome::TransportOnly(info()));
    assert_eq!(
        assert_ok!(transport_only.resolve("*systime")),
        Some(Route::Forward {
            wire: "*systime".to_string()
        })
    );
    assert_err!(transport_only.resolve("*memory"));

    let attached = attached_session();
    assert_ok!(attached.resolve("*memory"));
    assert_ok!(attached.resolve("*systime"));
}

/// Test: Unknown command message
/// Given no remote commands
/// When an unknown name is typed
/// Then the error names it the way the console prints it
#[test]
fn test_unknown_command_message() {
    let session = attached_session();
    let err = assert_err!(session.resolve("fly_to_moon 1"));
    assert_eq!(err.to_string(), "'fly_to_moon' is not a recognized command.");
}

/// Test: Blank and comment-only lines do nothing
#[test]
fn test_blank_and_comment_lines() {
    let session = attached_session();
    assert_eq!(assert_ok!(session.resolve("")), None);
    assert_eq!(assert_ok!(session.resolve("   \t ")), None);
    assert_eq!(assert_ok!(session.resolve("// just a note")), None);
}

/// Test: Quoted arguments reach local handlers intact
#[test]
fn test_local_args_are_tokenized() {
    let session = attached_session();
    let route = assert_ok!(session.resolve(r#"*connect "dev kit 2""#));
    assert_eq!(
        route,
        Some(Route::Local {
            action: LocalAction::Connect,
            args: vec!["dev kit 2".to_string()],
        })
    );
}

/// Test: Tokenizer edge cases seen on real command lines
#[test]
fn test_tokenizer_edge_cases() {
    assert_eq!(tokenize(r#"say "hello world" now"#), vec!["say", "hello world", "now"]);
    assert_eq!(tokenize(r#"echo "unterminated"#), vec!["echo", "unterminated"]);
    assert_eq!(tokenize(r#"set name """#), vec!["set", "name", ""]);
    assert_eq!(tokenize("a // b c"), vec!["a"]);

    let (first, rest) = split_first("MapInfo() name=c1a0 size=3").unwrap();
    assert_eq!(first, "MapInfo()");
    assert_eq!(rest, " name=c1a0 size=3");
    assert!(split_first("   ").is_none());
}

/// Test: Completion hints cover both tables
/// Given announced commands alongside the built-ins
/// When a prefix is completed
/// Then matches come from both, sorted and capped
#[test]
fn test_hints_span_local_and_remote() {
    let mut session = attached_session();
    announce(
        &mut session,
        r#"XCMD!AddCommands() "sv_cheats" "" "sv_gravity" "" "*setmemo" """#,
    );

    assert_eq!(session.hints("sv_", 8), vec!["sv_cheats", "sv_gravity"]);

    let hints = session.hints("*se", 8);
    assert_eq!(hints, vec!["*setcontext", "*setfileattributes", "*setmem", "*setmemo"]);
    assert_eq!(session.hints("*s", 2).len(), 2);
}

/// Test: Help lists remote commands only while attached
#[test]
fn test_help_shows_remote_section_when_attached() {
    let mut session = attached_session();
    announce(&mut session, r#"XCMD!AddCommands() "god" ": Toggle invulnerability""#);

    let lines = session.help_lines(None);
    assert!(lines.contains(&"Remote Commands: ( 1 )".to_string()));
    assert!(lines.contains(&"god".to_string()));

    let lines = session.help_lines(Some("go"));
    assert!(lines.contains(&"god : Toggle invulnerability".to_string()));
    assert!(!lines.iter().any(|l| l.starts_with("*go ")));

    let detached = Session::new(&Config::default());
    assert!(!detached
        .help_lines(None)
        .iter()
        .any(|l| l.starts_with("Remote Commands")));
}
