//! Console output lines and the bounded scrollback that holds them.

use std::collections::VecDeque;

use crate::log::Transcript;
use crate::protocol::Rgb;
use crate::vlog_warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Normal,
    /// The user's own input, echoed back.
    Echo,
    Error,
    /// Messages from the console itself (connection changes and the like).
    Notice,
    Color(Rgb),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub text: String,
    pub style: LineStyle,
}

impl ConsoleLine {
    pub fn new(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn normal(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Normal)
    }

    pub fn echo(input: &str) -> Self {
        Self::new(format!("] {}", input), LineStyle::Echo)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Error)
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Notice)
    }

    pub fn colored(text: impl Into<String>, color: Option<Rgb>) -> Self {
        match color {
            Some(rgb) => Self::new(text, LineStyle::Color(rgb)),
            None => Self::normal(text),
        }
    }
}

/// Oldest-first buffer of console lines, capped at `limit`.
#[derive(Debug)]
pub struct Scrollback {
    lines: VecDeque<ConsoleLine>,
    limit: usize,
    transcript: Option<Transcript>,
}

impl Scrollback {
    pub fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            limit: limit.max(1),
            transcript: None,
        }
    }

    /// Mirror every pushed line into `transcript`, or stop mirroring.
    pub fn set_transcript(&mut self, transcript: Option<Transcript>) {
        self.transcript = transcript;
    }

    /// Append a line. Embedded newlines split it into several lines of the
    /// same style.
    pub fn push(&mut self, line: ConsoleLine) {
        if line.text.contains('\n') {
            for part in line.text.split('\n') {
                self.push_one(ConsoleLine::new(part.trim_end_matches('\r'), line.style));
            }
        } else {
            self.push_one(line);
        }
    }

    fn push_one(&mut self, line: ConsoleLine) {
        if let Some(transcript) = &self.transcript {
            if let Err(e) = transcript.append(&line.text) {
                vlog_warn!("transcript write failed, disabling: {}", e);
                self.transcript = None;
            }
        }
        if self.lines.len() == self.limit {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = ConsoleLine>) {
        for line in lines {
            self.push(line);
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ConsoleLine> + ExactSizeIterator {
        self.lines.iter()
    }

    /// `count` lines ending `offset` lines above the newest one.
    pub fn window(&self, count: usize, offset: usize) -> Vec<ConsoleLine> {
        let end = self.lines.len().saturating_sub(offset);
        let start = end.saturating_sub(count);
        self.lines.range(start..end).cloned().collect()
    }
}
