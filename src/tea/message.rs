//! Messages for the TEA (The Elm Architecture) pattern.
//!
//! Messages are inputs to the update function - keyboard events, timer
//! ticks, notifications from the target and completion callbacks of
//! transport work.

use crossterm::event::KeyEvent;

use crate::remote::{ListenOutcome, Notification, PingOutcome};
use crate::Result;

/// Input messages to the update function.
#[derive(Debug)]
pub enum Message {
    /// Sent once before the first key.
    Startup,

    // Keyboard/terminal events
    Key(KeyEvent),
    Resize(u16, u16),

    // From the tick actor
    Tick,

    // From the transport's delivery thread, already classified
    Notification(Notification),

    // Transport work completion callbacks
    ListenFinished(ListenOutcome),
    PingFinished(PingOutcome),
    CommandFinished {
        wire: String,
        result: Result<Vec<String>>,
    },
    AckSent {
        code: i32,
        /// The ack answered the target's `Disconnect()`.
        then_disconnect: bool,
        result: Result<()>,
    },
}
