//! Line-oriented TCP transport.
//!
//! The target greets with `201- <name>`. After that each request is one
//! line and each reply starts with a status line:
//!
//! ```text
//! 200- <text>        single-line reply
//! 202- <text>        multi-line reply, lines follow until a lone "."
//! 203- <text>        binary reply (not supported)
//! 4xx- <reason>      request failed
//! NOTIFY <raw>       notification, may arrive at any time
//! ```
//!
//! A reader thread owns the socket's read half. Notifications go straight
//! to the session's sink from that thread; everything else is handed to
//! whichever request is waiting.

use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use super::{NotificationSink, Response, TargetInfo, Transport};
use crate::{vlog, vlog_debug, vlog_trace, vlog_warn, Error, Result};

pub const DEFAULT_PORT: u16 = 730;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const NOTIFY_PREFIX: &str = "NOTIFY ";
const MULTI_LINE_END: &str = ".";

type SharedSink = Arc<Mutex<Option<NotificationSink>>>;

struct Link {
    stream: TcpStream,
    replies: Receiver<String>,
}

pub struct TcpTransport {
    link: Mutex<Option<Link>>,
    sink: SharedSink,
    request_timeout: Duration,
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("connected", &self.is_connected())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Parsed `NNN- text` status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub code: u16,
    pub text: String,
}

impl StatusLine {
    pub fn parse(line: &str) -> Option<StatusLine> {
        let (code, rest) = line.split_once('-')?;
        if code.len() != 3 {
            return None;
        }
        let code = code.parse().ok()?;
        Some(StatusLine {
            code,
            text: rest.trim().to_string(),
        })
    }
}

/// `host`, `host:port` or empty for the local machine.
pub fn resolve_target(target: &str) -> Result<SocketAddr> {
    let target = target.trim();
    let spec = if target.is_empty() {
        format!("127.0.0.1:{}", DEFAULT_PORT)
    } else if target.contains(':') {
        target.to_string()
    } else {
        format!("{}:{}", target, DEFAULT_PORT)
    };
    spec.to_socket_addrs()
        .map_err(|e| Error::transport(format!("cannot resolve '{}': {}", spec, e)))?
        .next()
        .ok_or_else(|| Error::transport(format!("no address for '{}'", spec)))
}

impl TcpTransport {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            link: Mutex::new(None),
            sink: Arc::new(Mutex::new(None)),
            request_timeout,
        }
    }

    fn link(&self) -> MutexGuard<'_, Option<Link>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn recv(&self, replies: &Receiver<String>) -> Result<String> {
        match replies.recv_timeout(self.request_timeout) {
            Ok(line) => Ok(line),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(self.request_timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::transport("connection closed by target"))
            }
        }
    }
}

fn set_sink(sink: &SharedSink, value: Option<NotificationSink>) {
    *sink.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

fn current_sink(sink: &SharedSink) -> Option<NotificationSink> {
    sink.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn read_loop(reader: BufReader<TcpStream>, replies: Sender<String>, sink: SharedSink) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                vlog_debug!("tcp reader stopped: {}", e);
                break;
            }
        };
        let line = line.trim_end_matches('\r');
        if let Some(raw) = line.strip_prefix(NOTIFY_PREFIX) {
            match current_sink(&sink) {
                Some(sink) => {
                    sink.deliver(raw);
                }
                None => vlog_trace!("no session, ignoring notification {:?}", raw),
            }
            continue;
        }
        if replies.send(line.to_string()).is_err() {
            break;
        }
    }
    vlog_debug!("tcp reader exiting");
}

impl Transport for TcpTransport {
    fn connect(&self, target: &str) -> Result<TargetInfo> {
        self.disconnect();

        let addr = resolve_target(target)?;
        vlog_debug!("tcp connect {}", addr);
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| Error::transport(format!("{}: {}", addr, e)))?;
        stream.set_nodelay(true)?;

        let mut reader = BufReader::new(stream.try_clone()?);
        stream.set_read_timeout(Some(CONNECT_TIMEOUT))?;
        let mut greeting = String::new();
        reader
            .read_line(&mut greeting)
            .map_err(|e| Error::transport(format!("no greeting from {}: {}", addr, e)))?;
        stream.set_read_timeout(None)?;

        let name = match StatusLine::parse(greeting.trim_end()) {
            Some(StatusLine { code: 201, text }) if !text.is_empty() => text,
            Some(StatusLine { code: 201, .. }) => addr.to_string(),
            _ => {
                let _ = stream.shutdown(Shutdown::Both);
                return Err(Error::transport(format!(
                    "unexpected greeting from {}: {:?}",
                    addr,
                    greeting.trim_end()
                )));
            }
        };

        let (tx, rx) = unbounded();
        let sink = Arc::clone(&self.sink);
        thread::Builder::new()
            .name("vxconsole-delivery".to_string())
            .spawn(move || read_loop(reader, tx, sink))?;

        *self.link() = Some(Link {
            stream,
            replies: rx,
        });
        vlog!("connected to {} at {}", name, addr);
        Ok(TargetInfo {
            name,
            address: addr.to_string(),
        })
    }

    fn open_session(&self, sink: NotificationSink) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        set_sink(&self.sink, Some(sink));
        Ok(())
    }

    fn close_session(&self) {
        set_sink(&self.sink, None);
    }

    fn send(&self, command: &str) -> Result<Response> {
        let (mut writer, replies) = {
            let link = self.link();
            let link = link.as_ref().ok_or(Error::NotConnected)?;
            (link.stream.try_clone()?, link.replies.clone())
        };

        // Anything still queued belongs to a request that already timed out.
        let stale = replies.try_iter().count();
        if stale > 0 {
            vlog_warn!("discarding {} stale reply lines", stale);
        }

        writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .map_err(|e| Error::transport(format!("write failed: {}", e)))?;

        let line = self.recv(&replies)?;
        vlog_trace!("reply: {:?}", line);
        let Some(status) = StatusLine::parse(&line) else {
            return Ok(Response::Unexpected(line));
        };

        match status.code {
            200 => Ok(Response::Ok(status.text)),
            202 => {
                let mut lines = Vec::new();
                loop {
                    let next = self.recv(&replies)?;
                    if next == MULTI_LINE_END {
                        break;
                    }
                    lines.push(next);
                }
                Ok(Response::Multi(lines))
            }
            203 => Ok(Response::Binary),
            400..=499 if status.text.is_empty() => Err(Error::TransportCode(status.code.into())),
            400..=499 => Err(Error::transport(status.text)),
            _ => Ok(Response::Unexpected(line)),
        }
    }

    fn disconnect(&self) {
        set_sink(&self.sink, None);
        if let Some(link) = self.link().take() {
            // Wakes the reader thread, which then exits on its own.
            let _ = link.stream.shutdown(Shutdown::Both);
            vlog_debug!("tcp link closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.link().is_some()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}
