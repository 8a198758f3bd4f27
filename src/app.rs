use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use crossterm::event::{self, Event};
use crossterm::terminal;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::actors::{ActorHandle, TickActor};
use crate::config::Config;
use crate::log::{self, Transcript};
use crate::remote::{
    notification_channel, CaptureSwitches, ListenOutcome, Notification, NotificationSink,
    PingOutcome, RemoteClient, Transport, MAX_QUEUED_NOTIFICATIONS,
};
use crate::render::RenderState;
use crate::settings::SettingsStore;
use crate::tea::{update, Command, Message, Model};
use crate::util::blocking;
use crate::{vlog, vlog_debug, vlog_warn, Result};

const MAX_BG_MESSAGES: usize = 50;

/// Everything command execution needs besides the model.
struct Effects {
    client: RemoteClient,
    sink: NotificationSink,
    capture: Arc<CaptureSwitches>,
    msg_tx: mpsc::UnboundedSender<Message>,
    settings: Box<dyn SettingsStore>,
}

pub struct LogicThread;

impl LogicThread {
    pub fn run(
        config: Config,
        transport: Arc<dyn Transport>,
        settings: Box<dyn SettingsStore>,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        Runtime::new()?.block_on(Self::run_async(
            config, transport, settings, state_tx, shutdown,
        ))
    }

    async fn run_async(
        config: Config,
        transport: Arc<dyn Transport>,
        settings: Box<dyn SettingsStore>,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        vlog_debug!(
            "LogicThread::run_async target={:?} auto_connect={}",
            config.target,
            config.auto_connect
        );
        let capture = Arc::new(CaptureSwitches::new(
            config.capture_game_spew,
            config.capture_debug_spew,
        ));
        let (sink, notif_rx) = notification_channel(MAX_QUEUED_NOTIFICATIONS, capture.clone());
        let tick_interval = config.tick_interval();

        let mut model = Model::new(config);
        if let Ok(size) = terminal::size() {
            model.viewport = size;
        }
        if model.config.playtest_mode {
            open_transcript(&mut model);
        }

        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Message>();
        let actors = vec![TickActor::new(msg_tx.clone(), tick_interval).spawn()];
        let mut fx = Effects {
            client: RemoteClient::new(transport),
            sink,
            capture,
            msg_tx,
            settings,
        };

        if dispatch(&mut model, Message::Startup, &mut fx) {
            return finish(&model, &mut fx, &actors, &shutdown);
        }
        send_state(&state_tx, &model);

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Keyboard input (priority)
            while event::poll(Duration::ZERO)? {
                let msg = match event::read()? {
                    Event::Key(key) => Message::Key(key),
                    Event::Resize(width, height) => Message::Resize(width, height),
                    _ => continue,
                };
                if dispatch(&mut model, msg, &mut fx) {
                    return finish(&model, &mut fx, &actors, &shutdown);
                }
                if model.dirty {
                    send_state(&state_tx, &model);
                    model.dirty = false;
                }
            }

            // Notifications from the target (bounded)
            for notification in drain(&notif_rx, MAX_BG_MESSAGES) {
                if dispatch(&mut model, Message::Notification(notification), &mut fx) {
                    return finish(&model, &mut fx, &actors, &shutdown);
                }
            }

            // Background messages (bounded)
            for _ in 0..MAX_BG_MESSAGES {
                let Ok(msg) = msg_rx.try_recv() else { break };
                if dispatch(&mut model, msg, &mut fx) {
                    return finish(&model, &mut fx, &actors, &shutdown);
                }
            }

            if model.dirty {
                send_state(&state_tx, &model);
                model.dirty = false;
            }

            tokio::time::sleep(Duration::from_micros(500)).await;
        }

        finish(&model, &mut fx, &actors, &shutdown)
    }
}

fn drain(rx: &Receiver<Notification>, max: usize) -> Vec<Notification> {
    rx.try_iter().take(max).collect()
}

/// Run one message through `update` and execute what it asks for.
/// Returns `true` when the console should quit.
fn dispatch(model: &mut Model, msg: Message, fx: &mut Effects) -> bool {
    for cmd in update(model, msg) {
        if execute_command(model, cmd, fx) {
            return true;
        }
    }
    false
}

fn execute_command(model: &Model, cmd: Command, fx: &mut Effects) -> bool {
    match cmd {
        Command::Connect { target } => {
            vlog_debug!("Command::Connect target={:?}", target);
            let client = fx.client.clone();
            let sink = fx.sink.clone();
            let tx = fx.msg_tx.clone();
            tokio::spawn(async move {
                let outcome = blocking(move || Ok(client.listen(&target, sink)))
                    .await
                    .unwrap_or_else(|e| ListenOutcome::Failed(e.to_string()));
                let _ = tx.send(Message::ListenFinished(outcome));
            });
        }

        Command::Ping => {
            let client = fx.client.clone();
            let tx = fx.msg_tx.clone();
            tokio::spawn(async move {
                let outcome = blocking(move || Ok(client.ping()))
                    .await
                    .unwrap_or_else(|e| PingOutcome::Lost(e.to_string()));
                let _ = tx.send(Message::PingFinished(outcome));
            });
        }

        Command::Send { wire } => {
            vlog_debug!("Command::Send wire={:?}", wire);
            let client = fx.client.clone();
            let tx = fx.msg_tx.clone();
            tokio::spawn(async move {
                let command = wire.clone();
                let result = blocking(move || client.send_command(&command, true)).await;
                let _ = tx.send(Message::CommandFinished { wire, result });
            });
        }

        Command::Ack {
            code,
            then_disconnect,
        } => {
            let client = fx.client.clone();
            let tx = fx.msg_tx.clone();
            tokio::spawn(async move {
                let result = blocking(move || client.send_completion(code)).await;
                let _ = tx.send(Message::AckSent {
                    code,
                    then_disconnect,
                    result,
                });
            });
        }

        Command::Goodbye => {
            vlog_debug!("Command::Goodbye");
            fx.client.send_goodbye();
        }

        Command::Disconnect => {
            vlog_debug!("Command::Disconnect");
            fx.client.disconnect();
        }

        Command::SetCapture { game, debug } => {
            fx.capture.set_game(game);
            fx.capture.set_debug(debug);
        }

        Command::SaveSettings => save_settings(model, fx),

        Command::Quit => {
            vlog_debug!("Command::Quit");
            return true;
        }
    }
    false
}

fn save_settings(model: &Model, fx: &mut Effects) {
    model.store_settings(fx.settings.as_mut());
    if let Err(e) = fx.settings.flush() {
        vlog_warn!("failed to save settings: {}", e);
    }
}

fn finish(
    model: &Model,
    fx: &mut Effects,
    actors: &[ActorHandle],
    shutdown: &AtomicBool,
) -> Result<()> {
    shutdown.store(true, Ordering::Relaxed);
    vlog_debug!("Shutting down {} actors", actors.len());
    for actor in actors {
        actor.shutdown();
    }
    save_settings(model, fx);
    fx.client.disconnect();
    if fx.sink.dropped() > 0 {
        vlog_warn!("{} notifications dropped this run", fx.sink.dropped());
    }
    vlog!("console closed");
    Ok(())
}

fn open_transcript(model: &mut Model) {
    let Some(dir) = log::data_dir() else {
        vlog_warn!("no data directory, playtest transcript disabled");
        return;
    };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        vlog_warn!("cannot create {}: {}", dir.display(), e);
        return;
    }
    let transcript = Transcript::new(&dir, model.session.target());
    vlog!("playtest transcript at {}", transcript.path().display());
    model.scrollback.set_transcript(Some(transcript));
}

fn send_state(state_tx: &Sender<RenderState>, model: &Model) {
    let _ = state_tx.try_send(model.snapshot());
}
