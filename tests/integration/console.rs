//! Interactive console integration tests.
//!
//! Keys go through `update` exactly as the logic thread feeds them; the
//! commands it returns are checked, and preferences are carried across a
//! restart through a settings file.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use vxconsole::config::Config;
use vxconsole::remote::{classify, ListenOutcome};
use vxconsole::settings::{JsonSettings, SettingsStore};
use vxconsole::tea::{update, Command, Message, Model};

use crate::fixtures::{info, temp_settings_path};

fn type_line(model: &mut Model, line: &str) -> Vec<Command> {
    for c in line.chars() {
        update(model, Message::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
    }
    update(model, Message::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)))
}

fn attached_model() -> Model {
    let mut model = Model::new(Config::default());
    model.session.enable_auto_connect();
    update(&mut model, Message::ListenFinished(ListenOutcome::Session(info())));
    model
}

fn texts(model: &Model) -> Vec<String> {
    model.scrollback.iter().map(|l| l.text.clone()).collect()
}

/// Test: Typed remote command is forwarded
/// Given an attached console whose target announced `map`
/// When the user types `map c1a0` and presses Enter
/// Then the line is echoed and a Send with the prefixed wire is issued
#[test]
fn test_typed_remote_command_is_sent() {
    let mut model = attached_model();
    let cmds = update(
        &mut model,
        Message::Notification(classify(r#"XCMD!AddCommands() "map" "<name>""#)),
    );
    assert!(cmds.contains(&Command::Ack {
        code: 0,
        then_disconnect: false
    }));

    let cmds = type_line(&mut model, "map c1a0");
    assert_eq!(
        cmds,
        vec![Command::Send {
            wire: "XCMD!map c1a0".to_string()
        }]
    );
    assert!(texts(&model).contains(&"] map c1a0".to_string()));
    assert!(model.input.is_empty());
}

/// Test: Errors are printed, never fatal
#[test]
fn test_unknown_command_prints_error() {
    let mut model = attached_model();
    let cmds = type_line(&mut model, "fly_to_moon");
    assert!(cmds.is_empty());
    assert!(texts(&model).contains(&"'fly_to_moon' is not a recognized command.".to_string()));
}

/// Test: Tab completes from announced commands
#[test]
fn test_tab_completion() {
    let mut model = attached_model();
    update(
        &mut model,
        Message::Notification(classify(r#"XCMD!AddCommands() "sv_cheats" "" "sv_gravity" """#)),
    );
    for c in "sv_g".chars() {
        update(&mut model, Message::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
    }
    assert_eq!(model.hints, vec!["sv_gravity"]);
    update(&mut model, Message::Key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)));
    assert_eq!(model.input, "sv_gravity ");
}

/// Test: Preferences survive a restart
/// Given a console where the user connected to a new target and turned
/// game spew off
/// When settings are saved and a new config is built from them
/// Then the target and the capture switch come back
#[test]
fn test_preferences_survive_restart() {
    let (_dir, path) = temp_settings_path();

    let mut model = Model::new(Config::default());
    let cmds = type_line(&mut model, "*connect devkit2");
    assert!(cmds.contains(&Command::Connect {
        target: "devkit2".to_string()
    }));
    let cmds = type_line(&mut model, "*spew game off");
    assert!(cmds.contains(&Command::SetCapture {
        game: false,
        debug: true
    }));

    let mut settings = JsonSettings::load(&path).unwrap();
    model.store_settings(&mut settings);
    settings.flush().unwrap();

    let reloaded = JsonSettings::load(&path).unwrap();
    let mut config = Config::default();
    config.apply_settings(&reloaded);
    assert_eq!(config.target, "devkit2");
    assert!(!config.capture_game_spew);
    assert!(config.capture_debug_spew);
    assert!(config.auto_connect);
}

/// Test: Target disconnect is acked before teardown
#[test]
fn test_target_disconnect_acks_then_disconnects() {
    let mut model = attached_model();
    let cmds = update(
        &mut model,
        Message::Notification(classify("XCMD!Disconnect()")),
    );
    assert_eq!(
        cmds,
        vec![Command::Ack {
            code: 0,
            then_disconnect: true
        }]
    );

    let cmds = update(
        &mut model,
        Message::AckSent {
            code: 0,
            then_disconnect: true,
            result: Ok(()),
        },
    );
    assert_eq!(cmds, vec![Command::Disconnect]);
    assert!(!model.session.connection().has_transport());
}

/// Test: User disconnect says goodbye first
/// Given an attached console
/// When the user types `*disconnect`
/// Then the target is told before the link closes, and the console says so
#[test]
fn test_user_disconnect_says_goodbye() {
    let mut model = attached_model();
    let cmds = type_line(&mut model, "*disconnect");
    assert_eq!(
        cmds,
        vec![Command::Goodbye, Command::Disconnect, Command::SaveSettings]
    );
    assert!(texts(&model).contains(&"Closing Session.".to_string()));

    // Nothing is owed to a target that never attached.
    let mut model = Model::new(Config::default());
    type_line(&mut model, "*connect devkit");
    update(&mut model, Message::ListenFinished(ListenOutcome::TransportOnly(info())));
    let cmds = type_line(&mut model, "*disconnect");
    assert!(!cmds.contains(&Command::Goodbye));
}
