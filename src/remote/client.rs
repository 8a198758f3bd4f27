use std::sync::Arc;

use super::{NotificationSink, RequestGate, Response, TargetInfo, Transport};
use crate::protocol::{
    completion_command, connect_command, disconnect_command, is_ping, ping_command, ACK_PREFIX,
    DIRECT_MARKER,
};
use crate::{vlog, vlog_debug, vlog_error, vlog_trace, Error, Result};

/// How far a connect attempt got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// Transport up and the application answered.
    Session(TargetInfo),
    /// Transport up but nothing on the target took the connect command.
    TransportOnly(TargetInfo),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingOutcome {
    Alive,
    /// Another request owns the channel, so the target is evidently there.
    Busy,
    Lost(String),
}

/// Synchronous request side of a transport, serialized through the gate.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    gate: Arc<RequestGate>,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("gate_busy", &self.gate.is_busy())
            .finish()
    }
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            gate: Arc::new(RequestGate::new()),
        }
    }

    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send one command and return the lines worth printing.
    ///
    /// A leading `*` is the direct-route marker and is not sent. The bare
    /// routing prefix is a ping and its reply is ignored. A reply of plain
    /// `OK` (optionally behind the acknowledgement prefix) prints nothing.
    pub fn send_command(&self, command: &str, wait: bool) -> Result<Vec<String>> {
        let _permit = self.gate.acquire(wait)?;

        let command = command.strip_prefix(DIRECT_MARKER).unwrap_or(command);
        vlog_trace!("send: {:?}", command);
        let response = self.transport.send(command)?;

        if is_ping(command) {
            return Ok(Vec::new());
        }

        match response {
            Response::Ok(text) => {
                let text = text
                    .strip_prefix(ACK_PREFIX)
                    .map(str::trim_start)
                    .unwrap_or(&text);
                if text.is_empty() || text.eq_ignore_ascii_case("OK") {
                    Ok(Vec::new())
                } else {
                    Ok(vec![text.to_string()])
                }
            }
            Response::Multi(lines) => Ok(lines),
            Response::Binary => Err(Error::protocol(
                command,
                "binary responses are not implemented",
            )),
            Response::Unexpected(text) => Err(Error::protocol(
                command,
                format!("Unknown Response: ( {} )", text),
            )),
        }
    }

    /// Liveness probe. Never waits for the gate.
    pub fn ping(&self) -> PingOutcome {
        match self.send_command(ping_command(), false) {
            Ok(_) => PingOutcome::Alive,
            Err(Error::TransportBusy) => PingOutcome::Busy,
            Err(e) => {
                vlog_debug!("ping failed: {}", e);
                PingOutcome::Lost(e.to_string())
            }
        }
    }

    /// Acknowledge a synchronous notification.
    pub fn send_completion(&self, code: i32) -> Result<()> {
        self.send_command(&completion_command(code), true).map(|_| ())
    }

    /// Connect to `target` and try to attach to its application.
    pub fn listen(&self, target: &str, sink: NotificationSink) -> ListenOutcome {
        vlog_debug!("listen target={:?}", target);
        let info = match self.transport.connect(target) {
            Ok(info) => info,
            Err(e) => {
                vlog_debug!("connect to {:?} failed: {}", target, e);
                return ListenOutcome::Failed(e.to_string());
            }
        };

        if let Err(e) = self.transport.open_session(sink) {
            vlog_error!("could not open notification session: {}", e);
            return ListenOutcome::TransportOnly(info);
        }

        match self.send_command(&connect_command(), true) {
            Ok(_) => {
                vlog!("session open with {} ({})", info.name, info.address);
                ListenOutcome::Session(info)
            }
            Err(e) => {
                vlog_debug!("application did not answer connect: {}", e);
                self.transport.close_session();
                ListenOutcome::TransportOnly(info)
            }
        }
    }

    /// Tell the application the console is leaving. Skipped when another
    /// request holds the gate.
    pub fn send_goodbye(&self) {
        if let Err(e) = self.send_command(&disconnect_command(), false) {
            vlog_debug!("goodbye not sent: {}", e);
        }
    }

    pub fn disconnect(&self) {
        self.transport.close_session();
        self.transport.disconnect();
    }
}
