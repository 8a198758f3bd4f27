//! In-process target with canned replies.
//!
//! Used by the test suites and by `--offline`, which runs the console
//! against a small demo target.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use super::{NotificationSink, Response, TargetInfo, Transport};
use crate::protocol::{connect_command, COMMAND_PREFIX};
use crate::{vlog_debug, Error, Result};

#[derive(Debug)]
struct Script {
    reachable: bool,
    app_running: bool,
    connected: bool,
    sink: Option<NotificationSink>,
    /// Checked in insertion order; first case-insensitive prefix match wins.
    responses: Vec<(String, Response)>,
    /// Pushed through the sink once the application accepts the connect.
    on_session: Vec<String>,
    sent: Vec<String>,
    delay: Option<Duration>,
}

#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// A reachable target with its application running and no canned replies.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                reachable: true,
                app_running: true,
                connected: false,
                sink: None,
                responses: Vec::new(),
                on_session: Vec::new(),
                sent: Vec::new(),
                delay: None,
            }),
        }
    }

    /// A small pretend game, for trying the console without hardware.
    pub fn demo() -> Self {
        let transport = Self::new();
        transport.on_session(r#"XCMD!AddCommands() "map" "<name> : Load a map" "god" ": Toggle invulnerability" "noclip" ": Toggle noclip" "status" ": Show server status" "sv_cheats" "<0|1> : Allow cheats""#);
        transport.on_session("XPRT!XCLR[0000ff00]Demo target attached.");
        transport.on_session("XCMD!MapInfo() name=demo_lab entities=128 brushes=2048");
        transport.on_session(r#"XCMD!TextureList() "dev/dev_measuregeneric01" "tools/toolsnodraw""#);
        transport.on_session(r#"XCMD!TimeStampLog() 0.25 52428800 "session start""#);
        transport.respond(
            "XCMD!status",
            Response::Multi(vec![
                "hostname: demo".to_string(),
                "map     : demo_lab".to_string(),
                "players : 1 (1 max)".to_string(),
            ]),
        );
        transport.respond(
            "XCMD!__memory__",
            Response::Multi(vec![
                "Used: 312.4 MB".to_string(),
                "Free: 199.6 MB".to_string(),
            ]),
        );
        transport.respond("XCMD!map", Response::Ok("XACK map loading".to_string()));
        transport.respond("systime", Response::Ok("high=0x1d5a1 low=0x4c0ffee0".to_string()));
        transport.respond(
            "threads",
            Response::Multi(vec!["thread=1".to_string(), "thread=2".to_string()]),
        );
        transport
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_reachable(&self, reachable: bool) {
        let mut script = self.lock();
        script.reachable = reachable;
        if !reachable {
            script.connected = false;
            script.sink = None;
        }
    }

    pub fn set_app_running(&self, running: bool) {
        self.lock().app_running = running;
    }

    /// Reply with `response` to any command starting with `prefix`.
    pub fn respond(&self, prefix: &str, response: Response) {
        self.lock().responses.push((prefix.to_string(), response));
    }

    /// Queue a raw notification to push when the application attaches.
    pub fn on_session(&self, raw: &str) {
        self.lock().on_session.push(raw.to_string());
    }

    /// Hold every request for `delay` before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Push a notification as if the target had sent it. Returns `false`
    /// when no session is open or the sink refused it.
    pub fn notify(&self, raw: &str) -> bool {
        let sink = self.lock().sink.clone();
        sink.is_some_and(|sink| sink.deliver(raw))
    }

    /// Every command sent so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    pub fn session_open(&self) -> bool {
        self.lock().sink.is_some()
    }
}

impl Transport for ScriptedTransport {
    fn connect(&self, target: &str) -> Result<TargetInfo> {
        let mut script = self.lock();
        if !script.reachable {
            return Err(Error::transport(format!("no route to '{}'", target)));
        }
        script.connected = true;
        script.sink = None;
        Ok(TargetInfo {
            name: if target.is_empty() {
                "scripted".to_string()
            } else {
                target.to_string()
            },
            address: "in-process".to_string(),
        })
    }

    fn open_session(&self, sink: NotificationSink) -> Result<()> {
        let mut script = self.lock();
        if !script.connected {
            return Err(Error::NotConnected);
        }
        script.sink = Some(sink);
        Ok(())
    }

    fn close_session(&self) {
        self.lock().sink = None;
    }

    fn send(&self, command: &str) -> Result<Response> {
        let delay = {
            let mut script = self.lock();
            if !script.connected {
                return Err(Error::NotConnected);
            }
            if command.starts_with(COMMAND_PREFIX) && !script.app_running {
                return Err(Error::transport("no application is listening"));
            }
            script.sent.push(command.to_string());
            script.delay
        };

        // Outside the lock so tests can inspect the transport meanwhile.
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let (response, greeting) = {
            let script = self.lock();
            let response = script
                .responses
                .iter()
                .find(|(prefix, _)| crate::util::starts_with_ignore_case(command, prefix))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| Response::Ok("OK".to_string()));
            let greeting = if command == connect_command() {
                script.sink.clone().map(|sink| (sink, script.on_session.clone()))
            } else {
                None
            };
            (response, greeting)
        };

        if let Some((sink, notifications)) = greeting {
            vlog_debug!("scripted target pushing {} notifications", notifications.len());
            for raw in &notifications {
                sink.deliver(raw);
            }
        }
        Ok(response)
    }

    fn disconnect(&self) {
        let mut script = self.lock();
        script.connected = false;
        script.sink = None;
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}
