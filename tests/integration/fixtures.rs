//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - A fake devkit target speaking the line protocol on loopback
//! - Sessions already attached to a target
//! - Notification sinks with default capture settings
//! - Throwaway settings files

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use tempfile::TempDir;

use vxconsole::config::Config;
use vxconsole::remote::{
    notification_channel, CaptureSwitches, ListenOutcome, Notification, NotificationSink,
    TargetInfo,
};
use vxconsole::Session;

/// A target on 127.0.0.1 that greets, pushes notifications when the
/// console attaches, and answers requests from a prefix table.
pub struct FakeTarget {
    pub addr: String,
    received: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Clone, Default)]
pub struct FakeScript {
    /// Raw notifications sent (as `NOTIFY` lines) before the connect reply.
    pub on_attach: Vec<String>,
    /// First matching prefix wins; unmatched requests get `200- OK`.
    pub replies: Vec<(String, Vec<String>)>,
    /// Answer the attach request with a failure, as if no application ran.
    pub no_application: bool,
}

impl FakeScript {
    pub fn on_attach(mut self, raw: &str) -> Self {
        self.on_attach.push(raw.to_string());
        self
    }

    pub fn reply(mut self, prefix: &str, lines: &[&str]) -> Self {
        self.replies.push((
            prefix.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        ));
        self
    }

    pub fn without_application(mut self) -> Self {
        self.no_application = true;
        self
    }
}

impl FakeTarget {
    /// Serve a single console connection, then stop.
    pub fn start(script: FakeScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr").to_string();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        let handle = thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                serve(stream, &script, &log);
            }
        });
        Self {
            addr,
            received,
            handle: Some(handle),
        }
    }

    /// Every request line received so far.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    /// Wait for the console to hang up.
    pub fn join(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("fake target panicked");
        }
        self.received()
    }
}

fn serve(mut stream: TcpStream, script: &FakeScript, log: &Mutex<Vec<String>>) {
    stream.write_all(b"201- fakekit\r\n").unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut line = String::new();
    while reader.read_line(&mut line).unwrap_or(0) > 0 {
        let request = line.trim_end().to_string();
        line.clear();
        log.lock().unwrap().push(request.clone());

        let mut out = Vec::new();
        if request.starts_with("XCMD!__connect__") {
            if script.no_application {
                out.push("408- no application".to_string());
            } else {
                out.extend(script.on_attach.iter().map(|raw| format!("NOTIFY {}", raw)));
                out.push("200- OK".to_string());
            }
        } else if let Some((_, lines)) = script
            .replies
            .iter()
            .find(|(prefix, _)| request.starts_with(prefix.as_str()))
        {
            out.extend(lines.iter().cloned());
        } else {
            out.push("200- OK".to_string());
        }

        for reply in out {
            if stream.write_all(format!("{}\r\n", reply).as_bytes()).is_err() {
                return;
            }
        }
    }
}

pub fn info() -> TargetInfo {
    TargetInfo {
        name: "devkit".to_string(),
        address: "10.0.0.2:730".to_string(),
    }
}

/// A session that has just attached to a target with its application up.
pub fn attached_session() -> Session {
    let mut session = Session::new(&Config::default());
    session.enable_auto_connect();
    session.on_listen(&ListenOutcome::Session(info()));
    session
}

pub fn sink() -> (NotificationSink, Receiver<Notification>) {
    notification_channel(64, Arc::new(CaptureSwitches::default()))
}

/// A settings path inside a fresh temporary directory. Keep the `TempDir`
/// alive for as long as the path is used.
pub fn temp_settings_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("settings.json");
    (dir, path)
}
