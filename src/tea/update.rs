//! Pure update function for the TEA (The Elm Architecture) pattern.
//!
//! The update function takes a model and a message, mutates the model,
//! and returns a list of commands to execute. Local console commands run
//! here; anything that touches the target goes out as a [`Command`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::autoconnect::{Notice, Step};
use crate::dispatch::{LocalAction, Route};
use crate::output::ConsoleLine;
use crate::protocol::memory_command;
use crate::remote::{ListenOutcome, ResourceKind};
use crate::{vlog, vlog_debug, vlog_warn};

use super::command::Command;
use super::message::Message;
use super::model::Model;

/// Most completion hints shown at once.
pub const MAX_HINTS: usize = 8;

/// Helper to print an error line and mark model as dirty.
fn push_error(model: &mut Model, message: String) {
    vlog_warn!("console error: {}", message);
    model.scrollback.push(ConsoleLine::error(message));
    model.dirty = true;
}

fn push_lines(model: &mut Model, lines: impl IntoIterator<Item = ConsoleLine>) {
    model.scrollback.extend(lines);
    model.dirty = true;
}

/// Pure update function: Model + Message → Commands
pub fn update(model: &mut Model, msg: Message) -> Vec<Command> {
    let mut cmds = Vec::new();

    match msg {
        Message::Startup => {
            vlog!(
                "console ready, target {} auto_connect={}",
                model.session.display_name(),
                model.config.auto_connect
            );
            if model.config.auto_connect {
                run_local(model, LocalAction::Connect, &[], &mut cmds);
            }
        }

        Message::Key(key) => {
            if key.kind != KeyEventKind::Release {
                model.dirty = true;
                update_key(model, key, &mut cmds);
            }
        }

        Message::Resize(width, height) => {
            model.viewport = (width, height);
            model.dirty = true;
        }

        Message::Tick => {
            let steps = model.session.tick();
            let blink = model.session.connection().has_session() && !model.blink;
            if blink != model.blink {
                model.blink = blink;
                model.dirty = true;
            }
            apply_steps(model, steps, &mut cmds);
        }

        Message::Notification(notification) => {
            let handled = model.session.handle_notification(notification);
            if !handled.lines.is_empty() {
                push_lines(model, handled.lines);
            }
            if let Some(code) = handled.ack {
                cmds.push(Command::Ack {
                    code,
                    then_disconnect: handled.target_disconnected,
                });
            }
        }

        Message::ListenFinished(outcome) => {
            let steps = model.session.on_listen(&outcome);
            if !steps.contains(&Step::Discard) {
                match &outcome {
                    ListenOutcome::Session(info) => {
                        if model.config.cls_on_connect {
                            model.scrollback.clear();
                            model.scroll = 0;
                        }
                        push_lines(
                            model,
                            [ConsoleLine::notice(format!(
                                "Connected to {} ({}).",
                                info.name, info.address
                            ))],
                        );
                        cmds.push(Command::SaveSettings);
                    }
                    ListenOutcome::TransportOnly(info) => {
                        vlog_debug!("{} is up, application not running", info.name);
                    }
                    ListenOutcome::Failed(_) => {}
                }
            }
            model.dirty = true;
            apply_steps(model, steps, &mut cmds);
        }

        Message::PingFinished(outcome) => {
            let steps = model.session.on_ping(&outcome);
            if !steps.is_empty() {
                model.dirty = true;
            }
            apply_steps(model, steps, &mut cmds);
        }

        Message::CommandFinished { wire, result } => match result {
            Ok(lines) => {
                if !lines.is_empty() {
                    push_lines(model, lines.into_iter().map(ConsoleLine::normal));
                }
            }
            Err(e) => {
                vlog_debug!("Message::CommandFinished wire={:?} failed", wire);
                push_error(model, e.to_string());
            }
        },

        Message::AckSent {
            code,
            then_disconnect,
            result,
        } => {
            if let Err(e) = result {
                push_error(model, format!("Acknowledgement {} not delivered: {}", code, e));
            }
            if then_disconnect {
                model.session.on_remote_disconnect();
                model.blink = false;
                model.dirty = true;
                cmds.push(Command::Disconnect);
            }
        }
    }

    cmds
}

/// Turn auto-connect steps into commands and console lines.
fn apply_steps(model: &mut Model, steps: Vec<Step>, cmds: &mut Vec<Command>) {
    for step in steps {
        match step {
            Step::Connect => cmds.push(Command::Connect {
                target: model.session.target().to_string(),
            }),
            Step::Ping => cmds.push(Command::Ping),
            Step::Discard => cmds.push(Command::Disconnect),
            Step::Notice(notice) => {
                let line = match notice {
                    Notice::Waiting | Notice::Remaining { .. } => {
                        ConsoleLine::notice(notice.message())
                    }
                    Notice::GaveUp | Notice::ConnectionLost => {
                        ConsoleLine::error(notice.message())
                    }
                };
                if notice == Notice::ConnectionLost {
                    model.blink = false;
                }
                push_lines(model, [line]);
            }
        }
    }
}

fn update_key(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => cmds.push(Command::Quit),
        KeyCode::Char('l') if ctrl => {
            model.scrollback.clear();
            model.scroll = 0;
        }
        KeyCode::Enter => submit(model, cmds),
        KeyCode::Char(c) => {
            model.input.push(c);
            model.history.reset();
            refresh_hints(model);
        }
        KeyCode::Backspace => {
            model.input.pop();
            refresh_hints(model);
        }
        KeyCode::Esc => {
            model.input.clear();
            model.history.reset();
            clear_hints(model);
        }
        KeyCode::Up => {
            if let Some(line) = model.history.older() {
                model.input = line.to_string();
                clear_hints(model);
            }
        }
        KeyCode::Down => {
            model.input = model.history.newer().to_string();
            clear_hints(model);
        }
        KeyCode::Tab => cycle_hint(model, true),
        KeyCode::BackTab => cycle_hint(model, false),
        KeyCode::PageUp => {
            let max = model.scrollback.len().saturating_sub(model.output_rows());
            model.scroll = (model.scroll + model.output_rows()).min(max);
        }
        KeyCode::PageDown => {
            model.scroll = model.scroll.saturating_sub(model.output_rows());
        }
        _ => {}
    }
}

fn clear_hints(model: &mut Model) {
    model.hints.clear();
    model.hint_index = None;
}

/// Hints follow the command word; once arguments start they go away.
fn refresh_hints(model: &mut Model) {
    clear_hints(model);
    let partial = model.input.trim_start();
    if partial.is_empty() || partial.contains(char::is_whitespace) {
        return;
    }
    model.hints = model.session.hints(partial, MAX_HINTS);
}

fn cycle_hint(model: &mut Model, forward: bool) {
    if model.hints.is_empty() {
        refresh_hints(model);
        if model.hints.is_empty() {
            return;
        }
    }
    let count = model.hints.len();
    let index = match (model.hint_index, forward) {
        (None, true) => 0,
        (None, false) => count - 1,
        (Some(i), true) => (i + 1) % count,
        (Some(i), false) => (i + count - 1) % count,
    };
    model.hint_index = Some(index);
    model.input = format!("{} ", model.hints[index]);
}

fn submit(model: &mut Model, cmds: &mut Vec<Command>) {
    let line = std::mem::take(&mut model.input);
    clear_hints(model);
    model.scroll = 0;
    model.scrollback.push(ConsoleLine::echo(&line));
    model.history.push(&line);

    match model.session.resolve(&line) {
        Ok(Some(Route::Local { action, args })) => run_local(model, action, &args, cmds),
        Ok(Some(Route::Forward { wire })) => cmds.push(Command::Send { wire }),
        Ok(None) => {}
        Err(e) => push_error(model, e.to_string()),
    }
}

fn run_local(model: &mut Model, action: LocalAction, args: &[String], cmds: &mut Vec<Command>) {
    vlog_debug!("local {:?} args={:?}", action, args);
    let arg = args.first().map(String::as_str);

    match action {
        LocalAction::Cls => {
            model.scrollback.clear();
            model.scroll = 0;
        }

        LocalAction::Connect => {
            if let Some(target) = arg {
                model.session.set_target(target);
            }
            let session = &model.session;
            if session.connection().has_transport() || session.autoconnect().is_enabled() {
                if session.connection().has_session() {
                    cmds.push(Command::Goodbye);
                }
                model.session.user_disconnect();
                cmds.push(Command::Disconnect);
            }
            vlog!("connect requested to {}", model.session.display_name());
            let notice = format!("Connecting to {}...", model.session.display_name());
            push_lines(model, [ConsoleLine::notice(notice)]);
            let steps = model.session.enable_auto_connect();
            apply_steps(model, steps, cmds);
            cmds.push(Command::SaveSettings);
        }

        LocalAction::Disconnect => {
            let session = &model.session;
            if !session.connection().has_transport() && !session.autoconnect().is_enabled() {
                push_lines(model, [ConsoleLine::notice("Not connected.")]);
                return;
            }
            let name = session.display_name().to_string();
            if session.connection().has_session() {
                push_lines(model, [ConsoleLine::notice("Closing Session.")]);
                cmds.push(Command::Goodbye);
            }
            model.session.user_disconnect();
            model.blink = false;
            cmds.push(Command::Disconnect);
            cmds.push(Command::SaveSettings);
            push_lines(model, [ConsoleLine::notice(format!("Disconnected from {}.", name))]);
        }

        LocalAction::Help => {
            let lines = model.session.help_lines(arg);
            push_lines(model, lines.into_iter().map(ConsoleLine::normal));
        }

        LocalAction::Quit => cmds.push(Command::Quit),

        LocalAction::Memory => cmds.push(Command::Send {
            wire: memory_command(),
        }),

        LocalAction::Profile => {
            let lines = model.session.data().profile_lines();
            push_lines(model, lines.into_iter().map(ConsoleLine::normal));
        }

        LocalAction::TimeStamps => {
            let lines = model.session.data().timestamp_lines();
            push_lines(model, lines.into_iter().map(ConsoleLine::normal));
        }

        LocalAction::FreeMem => {
            let lines = model.session.data().free_memory_lines();
            push_lines(model, lines.into_iter().map(ConsoleLine::normal));
        }

        LocalAction::MapInfo => {
            let lines = model.session.data().map_info_lines();
            push_lines(model, lines.into_iter().map(ConsoleLine::normal));
        }

        LocalAction::Resources => {
            let kind = match arg {
                None => None,
                Some(name) => match ResourceKind::parse(name) {
                    Some(kind) => Some(kind),
                    None => {
                        push_error(
                            model,
                            format!(
                                "Unknown resource type '{}'. Use textures, materials or sounds.",
                                name
                            ),
                        );
                        return;
                    }
                },
            };
            let lines = model.session.data().resource_lines(kind);
            push_lines(model, lines.into_iter().map(ConsoleLine::normal));
        }

        LocalAction::Spew => run_spew(model, args, cmds),
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// `*spew [game|debug|all] [on|off]`. A channel without a value toggles.
fn run_spew(model: &mut Model, args: &[String], cmds: &mut Vec<Command>) {
    if let Some(which) = args.first() {
        let (game, debug) = match which.to_ascii_lowercase().as_str() {
            "game" => (true, false),
            "debug" => (false, true),
            "all" => (true, true),
            _ => {
                push_error(model, format!("Unknown spew channel '{}'. Use game, debug or all.", which));
                return;
            }
        };
        let value = match args.get(1) {
            Some(raw) => match parse_switch(raw) {
                Some(value) => Some(value),
                None => {
                    push_error(model, format!("Expected on or off, got '{}'.", raw));
                    return;
                }
            },
            None => None,
        };
        if game {
            model.capture_game = value.unwrap_or(!model.capture_game);
        }
        if debug {
            model.capture_debug = value.unwrap_or(!model.capture_debug);
        }
        cmds.push(Command::SetCapture {
            game: model.capture_game,
            debug: model.capture_debug,
        });
        cmds.push(Command::SaveSettings);
    }

    let status = format!(
        "Game spew: {}, Debug spew: {}",
        on_off(model.capture_game),
        on_off(model.capture_debug)
    );
    push_lines(model, [ConsoleLine::notice(status)]);
}
