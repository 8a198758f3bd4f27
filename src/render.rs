use std::sync::atomic::{AtomicU64, Ordering};

use crate::autoconnect::State as AutoState;
use crate::output::ConsoleLine;
use crate::session::ConnectionState;

/// What the status line shows about the target.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub target: String,
    pub connection: ConnectionState,
    pub autoconnect: AutoState,
    pub autoconnect_enabled: bool,
    /// Toggled every tick while a session is up.
    pub blink: bool,
    pub remote_commands: usize,
    pub capture_game: bool,
    pub capture_debug: bool,
}

impl StatusView {
    pub fn connection_label(&self) -> String {
        match (self.connection, self.autoconnect) {
            (ConnectionState::Disconnected, AutoState::Connecting) => "Connecting...".to_string(),
            (ConnectionState::Disconnected, AutoState::Backoff { remaining }) => {
                format!("Waiting ({})", remaining)
            }
            (state, _) => state.label().to_string(),
        }
    }
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            target: String::new(),
            connection: ConnectionState::Disconnected,
            autoconnect: AutoState::Idle,
            autoconnect_enabled: false,
            blink: false,
            remote_commands: 0,
            capture_game: true,
            capture_debug: true,
        }
    }
}

static VERSION_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn next_version() -> u64 {
    VERSION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub version: u64,
    /// Visible slice of the scrollback, oldest first.
    pub lines: Vec<ConsoleLine>,
    pub input: String,
    pub hints: Vec<String>,
    pub hint_index: Option<usize>,
    pub status: StatusView,
    /// Lines scrolled up from the bottom; 0 when following output.
    pub scroll: usize,
}
