//! Notification routing integration tests.
//!
//! These tests push raw notifications through a sink, the way a transport's
//! delivery thread does, and check what the session makes of them: console
//! lines, stored target data and the acknowledgement owed.

use std::sync::Arc;

use vxconsole::config::{AssertPolicy, Config};
use vxconsole::output::LineStyle;
use vxconsole::protocol::{color_tag, Rgb};
use vxconsole::remote::{
    notification_channel, CaptureSwitches, ListenOutcome, Notification, ResourceKind,
    MAX_QUEUED_NOTIFICATIONS,
};
use vxconsole::Session;

use crate::fixtures::{attached_session, info, sink};

/// Deliver `raws` through a sink and apply them in order.
fn route(session: &mut Session, raws: &[&str]) -> Vec<(Vec<String>, Option<i32>)> {
    let (sink, rx) = sink();
    for raw in raws {
        assert!(sink.deliver(raw), "{} was refused", raw);
    }
    rx.try_iter()
        .map(|n| {
            let handled = session.handle_notification(n);
            (
                handled.lines.into_iter().map(|l| l.text).collect(),
                handled.ack,
            )
        })
        .collect()
}

/// Test: Target data is stored for the viewing commands
/// Given an attached session
/// When the target reports map info, resources, time stamps and memory
/// Then the viewing commands show it, and only the sync verbs are acked
#[test]
fn test_reported_data_feeds_viewing_commands() {
    let mut session = attached_session();
    let results = route(
        &mut session,
        &[
            "XCMD!MapInfo() name=c1a0 entities=12",
            r#"XCMD!SoundList() "ambient/wind.wav" "weapons/shot.wav""#,
            r#"XCMD!TimeStampLog() 1.5 1048576 "level loaded""#,
            "XCMD!FreeMemory() 2097152",
            r#"XCMD!SetProfile() "render" "physics""#,
            "XCMD!SetProfileData() 4.5 1.25",
        ],
    );

    let acks: Vec<Option<i32>> = results.iter().map(|(_, ack)| *ack).collect();
    assert_eq!(acks, vec![Some(0), Some(0), Some(0), None, Some(0), None]);

    let data = session.data();
    assert_eq!(data.map_info_lines(), vec!["name: c1a0", "entities: 12"]);
    assert_eq!(
        data.resource_lines(Some(ResourceKind::Sounds)),
        vec!["sounds: ( 2 )", "  ambient/wind.wav", "  weapons/shot.wav"]
    );
    assert!(data.timestamp_lines()[0].ends_with("level loaded"));
    assert_eq!(data.latest_free_memory(), Some(2_097_152));
    let profile = data.profile_lines();
    assert_eq!(profile.len(), 2);
    assert!(profile[1].starts_with("physics"));
}

/// Test: Malformed payloads are reported, acked and not applied
/// Given an attached session with map info already stored
/// When a MapInfo arrives without key=value tokens
/// Then an error line is shown, the ack carries 1 and the old info stays
#[test]
fn test_malformed_payload_acked_with_failure() {
    let mut session = attached_session();
    route(&mut session, &["XCMD!MapInfo() name=c1a0"]);

    let results = route(&mut session, &[r#"XCMD!MapInfo() "c1a1""#]);
    let (lines, ack) = &results[0];
    assert_eq!(*ack, Some(1));
    assert!(lines[0].contains("key=value"), "{:?}", lines);
    assert_eq!(session.data().map_info_lines(), vec!["name: c1a0"]);
}

/// Test: Unknown verbs still get an answer
#[test]
fn test_unrecognized_verb_is_acked() {
    let mut session = attached_session();
    let results = route(&mut session, &["XCMD!Teleport() 1 2 3"]);
    let (lines, ack) = &results[0];
    assert_eq!(*ack, Some(1));
    assert!(lines[0].contains("Teleport()"));
}

/// Test: Asserts are answered per the configured policy
#[test]
fn test_assert_policy_sets_ack_code() {
    let mut config = Config::default();
    config.assert_policy = AssertPolicy::Break;
    let mut session = Session::new(&config);
    session.enable_auto_connect();
    session.on_listen(&ListenOutcome::Session(info()));

    let results = route(&mut session, &[r#"XCMD!Assert() "index out of range""#]);
    let (lines, ack) = &results[0];
    assert_eq!(*ack, Some(2));
    assert_eq!(lines[0], "Assert: index out of range");
}

/// Test: Colored prints keep their color
/// Given a print carrying a color tag
/// When it is routed
/// Then the line text is untagged and styled with that color
#[test]
fn test_colored_print() {
    let mut session = attached_session();
    let (sink, rx) = sink();
    let raw = format!("XPRT!{}Player joined", color_tag(Rgb::new(0x12, 0x34, 0x56)));
    assert!(sink.deliver(&raw));

    let handled = session.handle_notification(rx.try_recv().unwrap());
    assert_eq!(handled.ack, None);
    assert_eq!(handled.lines[0].text, "Player joined");
    assert_eq!(
        handled.lines[0].style,
        LineStyle::Color(Rgb::new(0x12, 0x34, 0x56))
    );
}

/// Test: Capture switches filter spew at the sink
/// Given game spew off and debug spew on
/// When both kinds arrive along with a command
/// Then only the debug line and the command are queued
#[test]
fn test_capture_switches_filter_spew() {
    let capture = Arc::new(CaptureSwitches::new(false, true));
    let (sink, rx) = notification_channel(8, Arc::clone(&capture));

    assert!(!sink.deliver("XPRT!game chatter"));
    assert!(sink.deliver("debugstr driver warning"));
    assert!(sink.deliver("XCMD!FreeMemory() 100"));

    let queued: Vec<Notification> = rx.try_iter().collect();
    assert_eq!(queued.len(), 2);
    assert!(matches!(&queued[0], Notification::Debug { text } if text == "driver warning"));

    // Flipping the switch takes effect for the next delivery.
    capture.set_game(true);
    assert!(sink.deliver("XPRT!game chatter"));
}

/// Test: A full queue drops and counts instead of blocking the transport
#[test]
fn test_full_queue_drops_and_counts() {
    let (sink, rx) = notification_channel(2, Arc::new(CaptureSwitches::default()));
    for i in 0..5 {
        sink.deliver(&format!("debugstr line {}", i));
    }
    assert_eq!(sink.dropped(), 3);
    assert_eq!(rx.try_iter().count(), 2);
}

/// Test: Commands the target waits on survive a full queue
/// Given a delivery queue already holding its limit of debug output
/// When the target announces commands and raises an assert
/// Then both are queued behind the output and each still gets its ack
#[test]
fn test_full_queue_keeps_acked_commands() {
    let (sink, rx) =
        notification_channel(MAX_QUEUED_NOTIFICATIONS, Arc::new(CaptureSwitches::default()));
    for i in 0..MAX_QUEUED_NOTIFICATIONS {
        assert!(sink.deliver(&format!("debugstr line {}", i)));
    }
    assert!(!sink.deliver("debugstr overflow"));
    assert!(sink.deliver(r#"XCMD!AddCommands() "map" "Load""#));
    assert!(sink.deliver(r#"XCMD!Assert() "bad pointer""#));
    assert_eq!(sink.dropped(), 1);

    let mut session = attached_session();
    let mut acks = Vec::new();
    for notification in rx.try_iter() {
        if let Some(code) = session.handle_notification(notification).ack {
            acks.push(code);
        }
    }
    assert_eq!(acks, vec![0, 0]);
    assert!(session.registry().find_remote("map").is_some());
}

/// Test: Target disconnect tears the session down after the ack
/// Given an attached session with announced commands
/// When the target sends Disconnect()
/// Then the ack is owed, and once it is out the session has no remote commands
#[test]
fn test_target_disconnect() {
    let mut session = attached_session();
    route(&mut session, &[r#"XCMD!AddCommands() "god" "Toggle""#]);

    let (sink, rx) = sink();
    sink.deliver("XCMD!Disconnect()");
    let handled = session.handle_notification(rx.try_recv().unwrap());
    assert!(handled.target_disconnected);
    assert_eq!(handled.ack, Some(0));

    session.on_remote_disconnect();
    assert!(!session.connection().has_transport());
    assert_eq!(session.registry().remote_len(), 0);
}

/// Test: Remote registration keeps the first definition
#[test]
fn test_first_registration_wins() {
    let mut session = attached_session();
    route(
        &mut session,
        &[
            r#"XCMD!AddCommands() "god" "first""#,
            r#"XCMD!AddCommands() "GOD" "second""#,
        ],
    );
    assert_eq!(session.registry().remote_len(), 1);
    assert_eq!(session.help_lines(Some("god"))[0], "god first");
}
