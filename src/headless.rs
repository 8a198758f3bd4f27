//! One-shot console: connect, run one line, print what came back, leave.
//!
//! Drives the same [`Session`] and [`RemoteClient`] as the interactive
//! console, without the terminal UI or the timer. Notifications are drained
//! between steps so remote commands the target announces on attach can be
//! dispatched.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::config::Config;
use crate::dispatch::{LocalAction, Route, LOCAL_COMMANDS};
use crate::output::ConsoleLine;
use crate::protocol::memory_command;
use crate::remote::{
    notification_channel, CaptureSwitches, ListenOutcome, Notification, NotificationSink,
    RemoteClient, ResourceKind, Transport, MAX_QUEUED_NOTIFICATIONS,
};
use crate::session::Session;
use crate::{vlog, vlog_debug, vlog_warn, Error, Result};

/// How long the target may stay quiet before a drain is considered done.
pub const SETTLE_TIME: Duration = Duration::from_millis(250);

pub struct Headless {
    client: RemoteClient,
    session: Session,
    sink: NotificationSink,
    notifications: Receiver<Notification>,
    settle: Duration,
}

impl Headless {
    /// Connect to the configured target. Fails when the target cannot be
    /// reached at all; a target without its application still connects.
    pub fn connect(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let capture = Arc::new(CaptureSwitches::new(
            config.capture_game_spew,
            config.capture_debug_spew,
        ));
        let (sink, notifications) = notification_channel(MAX_QUEUED_NOTIFICATIONS, capture);
        let mut headless = Self {
            client: RemoteClient::new(transport),
            session: Session::new(config),
            sink,
            notifications,
            settle: SETTLE_TIME,
        };

        // Puts the machine in Connecting so the outcome is applied, not discarded.
        headless.session.enable_auto_connect();
        let outcome = headless
            .client
            .listen(headless.session.target(), headless.sink.clone());
        headless.session.on_listen(&outcome);
        match outcome {
            ListenOutcome::Session(info) => vlog!("exec: attached to {}", info.name),
            ListenOutcome::TransportOnly(info) => {
                vlog_warn!("exec: {} has no application running", info.name)
            }
            ListenOutcome::Failed(reason) => return Err(Error::transport(reason)),
        }
        Ok(headless)
    }

    pub fn with_settle_time(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handle notifications until the target goes quiet, acknowledging
    /// the synchronous ones.
    pub fn drain(&mut self, out: &mut dyn Write) -> Result<()> {
        loop {
            let notification = match self.notifications.recv_timeout(self.settle) {
                Ok(notification) => notification,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Ok(())
                }
            };
            let handled = self.session.handle_notification(notification);
            write_lines(out, &handled.lines)?;
            if let Some(code) = handled.ack {
                if let Err(e) = self.client.send_completion(code) {
                    vlog_warn!("exec: ack {} failed: {}", code, e);
                }
            }
            if handled.target_disconnected {
                self.session.on_remote_disconnect();
                return Ok(());
            }
        }
    }

    /// Dispatch one line and print its output.
    pub fn run(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        vlog_debug!("exec: {:?}", line);
        let Some(route) = self.session.resolve(line)? else {
            return Ok(());
        };

        let lines = match route {
            Route::Forward { wire } => self.client.send_command(&wire, true)?,
            Route::Local { action, args } => self.run_local(action, &args)?,
        };
        for line in lines {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    fn run_local(&self, action: LocalAction, args: &[String]) -> Result<Vec<String>> {
        let arg = args.first().map(String::as_str);
        let data = self.session.data();
        let lines = match action {
            LocalAction::Help => self.session.help_lines(arg),
            LocalAction::Memory => self.client.send_command(&memory_command(), true)?,
            LocalAction::Profile => data.profile_lines(),
            LocalAction::TimeStamps => data.timestamp_lines(),
            LocalAction::FreeMem => data.free_memory_lines(),
            LocalAction::MapInfo => data.map_info_lines(),
            LocalAction::Resources => match arg {
                None => data.resource_lines(None),
                Some(name) => match ResourceKind::parse(name) {
                    Some(kind) => data.resource_lines(Some(kind)),
                    None => {
                        return Err(Error::Validation(format!(
                            "unknown resource type '{}'",
                            name
                        )))
                    }
                },
            },
            LocalAction::Cls
            | LocalAction::Connect
            | LocalAction::Disconnect
            | LocalAction::Quit
            | LocalAction::Spew => {
                return Err(Error::Validation(format!(
                    "{:?} only makes sense in the interactive console",
                    action
                )))
            }
        };
        Ok(lines)
    }

    pub fn disconnect(self) {
        if self.session.connection().has_session() {
            self.client.send_goodbye();
        }
        self.client.disconnect();
        if self.sink.dropped() > 0 {
            vlog_warn!("exec: {} notifications dropped", self.sink.dropped());
        }
    }
}

fn write_lines(out: &mut dyn Write, lines: &[ConsoleLine]) -> Result<()> {
    for line in lines {
        writeln!(out, "{}", line.text)?;
    }
    Ok(())
}

/// `vxconsole exec`: connect, run `line`, print, disconnect.
pub fn exec(
    config: &Config,
    transport: Arc<dyn Transport>,
    line: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let mut headless = Headless::connect(config, transport)?;
    let result = headless
        .drain(out)
        .and_then(|_| headless.run(line, out))
        .and_then(|_| headless.drain(out));
    headless.disconnect();
    result
}

/// `vxconsole commands`: the built-in command table.
pub fn print_commands(out: &mut dyn Write) -> Result<()> {
    let width = LOCAL_COMMANDS
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);
    for command in LOCAL_COMMANDS {
        writeln!(out, "{:<width$} {}", command.name, command.help, width = width)?;
    }
    Ok(())
}
