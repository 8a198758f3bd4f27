//! Model for the TEA (The Elm Architecture) pattern.
//!
//! Console state only: no channels, no handles, no transport. The
//! [`Session`] inside it is the single owner of the command registry and
//! the connection state.

use std::collections::VecDeque;

use crate::config::Config;
use crate::output::Scrollback;
use crate::render::{next_version, RenderState, StatusView};
use crate::session::Session;
use crate::settings::{keys, SettingsStore};

/// Lines entered at the prompt, oldest first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    limit: usize,
    /// Entry being recalled; `None` while editing a fresh line.
    cursor: Option<usize>,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
            cursor: None,
        }
    }

    /// Remember `line`. Blank lines and repeats of the newest entry are
    /// skipped.
    pub fn push(&mut self, line: &str) {
        self.cursor = None;
        let line = line.trim();
        if line.is_empty() || self.entries.back().map(String::as_str) == Some(line) {
            return;
        }
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
    }

    /// Step back one entry (Up). Stops at the oldest.
    pub fn older(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let index = match self.cursor {
            None => self.entries.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.cursor = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    /// Step forward one entry (Down). Past the newest is an empty line.
    pub fn newer(&mut self) -> &str {
        match self.cursor {
            Some(i) if i + 1 < self.entries.len() => {
                self.cursor = Some(i + 1);
                &self.entries[i + 1]
            }
            _ => {
                self.cursor = None;
                ""
            }
        }
    }

    pub fn reset(&mut self) {
        self.cursor = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Pure application state - the single source of truth.
#[derive(Debug)]
pub struct Model {
    pub session: Session,
    pub scrollback: Scrollback,

    // Input state
    pub input: String,
    pub history: History,
    pub hints: Vec<String>,
    pub hint_index: Option<usize>,

    // View state
    pub scroll: usize,
    pub viewport: (u16, u16),
    pub blink: bool,

    // Mirrored into the delivery thread's switches by Command::SetCapture
    pub capture_game: bool,
    pub capture_debug: bool,

    // Dirty flag - set when state changes and render is needed
    pub dirty: bool,

    // Config (immutable after init)
    pub config: Config,
}

impl Model {
    pub fn new(config: Config) -> Self {
        Self {
            session: Session::new(&config),
            scrollback: Scrollback::new(config.scrollback_limit),
            input: String::new(),
            history: History::new(config.history_limit),
            hints: Vec::new(),
            hint_index: None,
            scroll: 0,
            viewport: (80, 24),
            blink: false,
            capture_game: config.capture_game_spew,
            capture_debug: config.capture_debug_spew,
            dirty: true,
            config,
        }
    }

    /// Rows available to the output log: everything but the input and
    /// status lines.
    pub fn output_rows(&self) -> usize {
        self.viewport.1.saturating_sub(2).max(1) as usize
    }

    /// Write the runtime-changeable preferences back to `settings`.
    pub fn store_settings(&self, settings: &mut dyn SettingsStore) {
        settings.set(keys::LAST_TARGET, self.session.target());
        settings.set_window_size(self.viewport.0, self.viewport.1);
        settings.set_bool(keys::AUTO_CONNECT, self.session.autoconnect().is_enabled());
        settings.set_bool(keys::CAPTURE_GAME_SPEW, self.capture_game);
        settings.set_bool(keys::CAPTURE_DEBUG_SPEW, self.capture_debug);
        settings.set_bool(keys::PLAYTEST_MODE, self.config.playtest_mode);
    }

    /// Create an immutable snapshot for the render thread.
    ///
    /// Each snapshot gets a monotonically increasing version number so the
    /// render thread can skip redundant draws.
    pub fn snapshot(&self) -> RenderState {
        let session = &self.session;
        RenderState {
            version: next_version(),
            lines: self.scrollback.window(self.output_rows(), self.scroll),
            input: self.input.clone(),
            hints: self.hints.clone(),
            hint_index: self.hint_index,
            status: StatusView {
                target: session.display_name().to_string(),
                connection: session.connection(),
                autoconnect: session.autoconnect().state(),
                autoconnect_enabled: session.autoconnect().is_enabled(),
                blink: self.blink,
                remote_commands: session.registry().remote_len(),
                capture_game: self.capture_game,
                capture_debug: self.capture_debug,
            },
            scroll: self.scroll,
        }
    }
}
