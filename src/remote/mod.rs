//! Talking to the target: transports, the request gate, the notification
//! router and the client that ties them together.

pub mod client;
pub mod gate;
pub mod router;
pub mod scripted;
pub mod tcp;

pub use client::{ListenOutcome, PingOutcome, RemoteClient};
pub use gate::{GatePermit, RequestGate};
pub use router::{
    classify, notification_channel, CaptureSwitches, Notification, NotificationSink,
    ResourceKind, TargetEvent, TimeStamp, MAX_QUEUED_NOTIFICATIONS,
};
pub use scripted::ScriptedTransport;
pub use tcp::TcpTransport;

use crate::Result;

/// Reply to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Single line.
    Ok(String),
    /// Multi-line reply, terminator already removed.
    Multi(Vec<String>),
    /// Binary payload; not supported by the console.
    Binary,
    /// Status the console does not know how to read.
    Unexpected(String),
}

/// What the transport learned about the target while connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub name: String,
    pub address: String,
}

/// A connection to a target.
///
/// All methods block. Calls that can take a while (`connect`, `send`) are
/// run on blocking workers, never on the logic thread.
pub trait Transport: Send + Sync {
    /// Open the link to `target`, dropping any previous one.
    fn connect(&self, target: &str) -> Result<TargetInfo>;

    /// Start delivering notifications into `sink` from the transport's own
    /// thread.
    fn open_session(&self, sink: NotificationSink) -> Result<()>;

    /// Stop delivering notifications. The link stays up.
    fn close_session(&self);

    /// Send one request and wait for its reply.
    fn send(&self, command: &str) -> Result<Response>;

    fn disconnect(&self);

    fn is_connected(&self) -> bool;
}
