//! Commands for the TEA (The Elm Architecture) pattern.
//!
//! Commands are outputs from the update function - they represent side effects
//! to be executed by the runtime.

/// Output commands from the update function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Transport work (spawned on blocking workers)
    Connect { target: String },
    Ping,
    Send { wire: String },
    Ack { code: i32, then_disconnect: bool },

    // Run inline; neither waits on the gate
    Goodbye,
    Disconnect,

    // Shared with the delivery thread
    SetCapture { game: bool, debug: bool },

    // Settings persistence
    SaveSettings,

    // App lifecycle
    Quit,
}
