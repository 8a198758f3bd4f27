//! Notification router.
//!
//! Runs on the transport's delivery thread. Every raw string the target
//! pushes is classified into a [`Notification`] and queued for the logic
//! thread, which is the only place console state changes. Payload parsing
//! happens here too so that bad payloads are caught before they cross
//! threads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::dispatch::{split_first, Tokenizer};
use crate::protocol::{strip_color, Rgb, Verb, COMMAND_PREFIX, DEBUG_PREFIX, PRINT_PREFIX};
use crate::{vlog_trace, vlog_warn, Error, Result};

/// Queue depth past which output notifications are dropped. Notifications
/// the target waits on are always queued.
pub const MAX_QUEUED_NOTIFICATIONS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Textures,
    Materials,
    Sounds,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Textures,
        ResourceKind::Materials,
        ResourceKind::Sounds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Textures => "textures",
            ResourceKind::Materials => "materials",
            ResourceKind::Sounds => "sounds",
        }
    }

    pub fn parse(name: &str) -> Option<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeStamp {
    pub time: f32,
    pub memory: u64,
    pub label: String,
}

/// A target command with its payload already parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetEvent {
    AddCommands(Vec<(String, String)>),
    SetProfile(Vec<String>),
    SetProfileData(Vec<f32>),
    ResourceList {
        kind: ResourceKind,
        entries: Vec<String>,
    },
    TimeStampLog(TimeStamp),
    MemDump {
        path: String,
    },
    MapInfo(Vec<(String, String)>),
    Assert {
        message: String,
    },
    FreeMemory(u64),
    Disconnect,
}

impl TargetEvent {
    pub fn verb(&self) -> Verb {
        match self {
            TargetEvent::AddCommands(_) => Verb::AddCommands,
            TargetEvent::SetProfile(_) => Verb::SetProfile,
            TargetEvent::SetProfileData(_) => Verb::SetProfileData,
            TargetEvent::ResourceList { kind, .. } => match kind {
                ResourceKind::Textures => Verb::TextureList,
                ResourceKind::Materials => Verb::MaterialList,
                ResourceKind::Sounds => Verb::SoundList,
            },
            TargetEvent::TimeStampLog(_) => Verb::TimeStampLog,
            TargetEvent::MemDump { .. } => Verb::MemDump,
            TargetEvent::MapInfo(_) => Verb::MapInfo,
            TargetEvent::Assert { .. } => Verb::Assert,
            TargetEvent::FreeMemory(_) => Verb::FreeMemory,
            TargetEvent::Disconnect => Verb::Disconnect,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Print { color: Option<Rgb>, text: String },
    Debug { text: String },
    Event(TargetEvent),
    /// Known verb, unusable payload.
    Malformed { verb: Verb, detail: String },
    /// Command prefix with a verb nobody handles.
    Unrecognized { raw: String },
}

impl Notification {
    /// Whether the target waits for a completion acknowledgement.
    pub fn expects_ack(&self) -> bool {
        match self {
            Notification::Event(event) => !event.verb().is_async(),
            Notification::Malformed { verb, .. } => !verb.is_async(),
            Notification::Unrecognized { .. } => true,
            Notification::Print { .. } | Notification::Debug { .. } => false,
        }
    }
}

/// Classify one raw notification string.
pub fn classify(raw: &str) -> Notification {
    if let Some(rest) = raw.strip_prefix(COMMAND_PREFIX) {
        return classify_command(raw, rest);
    }
    if let Some(rest) = raw.strip_prefix(PRINT_PREFIX) {
        let rest = trim_newline(rest);
        return match strip_color(rest) {
            Ok(Some((color, text))) => Notification::Print {
                color: Some(color),
                text: text.to_string(),
            },
            Ok(None) => Notification::Print {
                color: None,
                text: rest.to_string(),
            },
            Err(e) => {
                vlog_warn!("{}", e);
                Notification::Print {
                    color: None,
                    text: rest.to_string(),
                }
            }
        };
    }
    let text = raw.strip_prefix(DEBUG_PREFIX).unwrap_or(raw);
    Notification::Debug {
        text: trim_newline(text).to_string(),
    }
}

fn classify_command(raw: &str, rest: &str) -> Notification {
    let Some((token, payload)) = split_first(rest) else {
        return Notification::Unrecognized {
            raw: raw.to_string(),
        };
    };
    let Some(verb) = Verb::from_wire(&token) else {
        return Notification::Unrecognized {
            raw: raw.to_string(),
        };
    };
    match parse_event(verb, payload) {
        Ok(event) => Notification::Event(event),
        Err(e) => {
            vlog_warn!("dropping {}: {}", verb, e);
            Notification::Malformed {
                verb,
                detail: e.to_string(),
            }
        }
    }
}

/// Parse the payload that follows a verb.
pub fn parse_event(verb: Verb, payload: &str) -> Result<TargetEvent> {
    let tokens: Vec<String> = Tokenizer::new(payload).collect();
    let violation = |detail: String| Error::protocol(verb.wire_name(), detail);

    let event = match verb {
        Verb::AddCommands => {
            if tokens.len() % 2 != 0 {
                return Err(violation(format!(
                    "expected name/help pairs, got {} tokens",
                    tokens.len()
                )));
            }
            let pairs = tokens
                .chunks_exact(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();
            TargetEvent::AddCommands(pairs)
        }
        Verb::SetProfile => TargetEvent::SetProfile(tokens),
        Verb::SetProfileData => {
            let samples = tokens
                .iter()
                .map(|t| {
                    t.parse::<f32>()
                        .map_err(|_| violation(format!("bad sample '{}'", t)))
                })
                .collect::<Result<Vec<_>>>()?;
            TargetEvent::SetProfileData(samples)
        }
        Verb::TextureList => resource_list(ResourceKind::Textures, tokens),
        Verb::MaterialList => resource_list(ResourceKind::Materials, tokens),
        Verb::SoundList => resource_list(ResourceKind::Sounds, tokens),
        Verb::TimeStampLog => {
            let [time, memory, label] = tokens.as_slice() else {
                return Err(violation(format!(
                    "expected time, memory and label, got {} tokens",
                    tokens.len()
                )));
            };
            TargetEvent::TimeStampLog(TimeStamp {
                time: time
                    .parse()
                    .map_err(|_| violation(format!("bad time '{}'", time)))?,
                memory: memory
                    .parse()
                    .map_err(|_| violation(format!("bad memory '{}'", memory)))?,
                label: label.clone(),
            })
        }
        Verb::MemDump => match tokens.first() {
            Some(path) if !path.is_empty() => TargetEvent::MemDump { path: path.clone() },
            _ => return Err(violation("missing dump path".to_string())),
        },
        Verb::MapInfo => {
            let pairs = tokens
                .iter()
                .map(|t| {
                    t.split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .ok_or_else(|| violation(format!("expected key=value, got '{}'", t)))
                })
                .collect::<Result<Vec<_>>>()?;
            TargetEvent::MapInfo(pairs)
        }
        Verb::Assert => TargetEvent::Assert {
            message: tokens.join(" "),
        },
        Verb::FreeMemory => match tokens.as_slice() {
            [bytes] => TargetEvent::FreeMemory(
                bytes
                    .parse()
                    .map_err(|_| violation(format!("bad byte count '{}'", bytes)))?,
            ),
            _ => return Err(violation("expected a single byte count".to_string())),
        },
        Verb::Disconnect => TargetEvent::Disconnect,
    };
    Ok(event)
}

fn resource_list(kind: ResourceKind, entries: Vec<String>) -> TargetEvent {
    TargetEvent::ResourceList { kind, entries }
}

fn trim_newline(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

/// Switches for dropping output the user does not want to see.
#[derive(Debug)]
pub struct CaptureSwitches {
    game: AtomicBool,
    debug: AtomicBool,
}

impl CaptureSwitches {
    pub fn new(game: bool, debug: bool) -> Self {
        Self {
            game: AtomicBool::new(game),
            debug: AtomicBool::new(debug),
        }
    }

    pub fn game(&self) -> bool {
        self.game.load(Ordering::Relaxed)
    }

    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn set_game(&self, on: bool) {
        self.game.store(on, Ordering::Relaxed);
    }

    pub fn set_debug(&self, on: bool) {
        self.debug.store(on, Ordering::Relaxed);
    }
}

impl Default for CaptureSwitches {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// Producer half handed to a transport when a session opens.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: Sender<Notification>,
    capacity: usize,
    capture: Arc<CaptureSwitches>,
    dropped: Arc<AtomicU64>,
}

/// Create the delivery queue.
pub fn notification_channel(
    capacity: usize,
    capture: Arc<CaptureSwitches>,
) -> (NotificationSink, Receiver<Notification>) {
    let (tx, rx) = unbounded();
    let sink = NotificationSink {
        tx,
        capacity,
        capture,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (sink, rx)
}

impl NotificationSink {
    /// Classify and queue one raw string. Returns `false` when the
    /// notification was filtered out or dropped.
    ///
    /// Only output and async samples are dropped once `capacity` is
    /// queued. Anything that expects an ack goes through regardless, or
    /// the target would wait forever.
    pub fn deliver(&self, raw: &str) -> bool {
        vlog_trace!("notify: {:?}", raw);
        let notification = classify(raw);
        match notification {
            Notification::Print { .. } if !self.capture.game() => return false,
            Notification::Debug { .. } if !self.capture.debug() => return false,
            _ => {}
        }
        if !notification.expects_ack() && self.tx.len() >= self.capacity {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if total == 1 || total % 100 == 0 {
                vlog_warn!("notification queue full, {} dropped so far", total);
            }
            return false;
        }
        self.tx.send(notification).is_ok()
    }

    /// Notifications lost to a full queue.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capture(&self) -> &Arc<CaptureSwitches> {
        &self.capture
    }
}
