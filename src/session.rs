//! Everything the console knows about its current target.
//!
//! A `Session` is owned by the logic thread. Connection state changes only
//! through connect and ping results, the target's own disconnect, or an
//! explicit user disconnect; command handlers never change it.

use crate::autoconnect::{AutoConnect, LinkResult, Notice, PingResult, Step, Timing};
use crate::config::{AssertPolicy, Config};
use crate::dispatch::{CommandRegistry, Route};
use crate::output::ConsoleLine;
use crate::remote::{ListenOutcome, Notification, PingOutcome, TargetEvent, TargetInfo};
use crate::target_data::TargetData;
use crate::{vlog, vlog_debug, vlog_warn, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    ConnectedTransportOnly,
    ConnectedWithSession,
}

impl ConnectionState {
    pub fn has_transport(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    pub fn has_session(&self) -> bool {
        matches!(self, ConnectionState::ConnectedWithSession)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::ConnectedTransportOnly => "Target",
            ConnectionState::ConnectedWithSession => "Application",
        }
    }
}

/// What handling one notification produced.
#[derive(Debug, Default, PartialEq)]
pub struct Handled {
    pub lines: Vec<ConsoleLine>,
    /// Completion code to send back, for synchronous notifications.
    pub ack: Option<i32>,
    /// The target said goodbye; tear down once the ack is out.
    pub target_disconnected: bool,
}

#[derive(Debug)]
pub struct Session {
    target: String,
    connection: ConnectionState,
    registry: CommandRegistry,
    autoconnect: AutoConnect,
    info: Option<TargetInfo>,
    connect_count: u32,
    data: TargetData,
    assert_policy: AssertPolicy,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            target: config.target.clone(),
            connection: ConnectionState::Disconnected,
            registry: CommandRegistry::with_builtins(),
            autoconnect: AutoConnect::new(Timing::from(config)),
            info: None,
            connect_count: 0,
            data: TargetData::default(),
            assert_policy: config.assert_policy,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn set_target(&mut self, target: &str) {
        self.target = target.to_string();
    }

    /// Name to show for the target: what it called itself, else what we
    /// were told to connect to.
    pub fn display_name(&self) -> &str {
        match &self.info {
            Some(info) => &info.name,
            None if self.target.is_empty() => "localhost",
            None => &self.target,
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn autoconnect(&self) -> &AutoConnect {
        &self.autoconnect
    }

    pub fn info(&self) -> Option<&TargetInfo> {
        self.info.as_ref()
    }

    pub fn connect_count(&self) -> u32 {
        self.connect_count
    }

    pub fn data(&self) -> &TargetData {
        &self.data
    }

    pub fn resolve(&self, line: &str) -> Result<Option<Route>> {
        self.registry.resolve(line, self.connection)
    }

    pub fn help_lines(&self, topic: Option<&str>) -> Vec<String> {
        self.registry
            .help_lines(topic, self.connection.has_session())
    }

    pub fn hints(&self, partial: &str, max: usize) -> Vec<String> {
        self.registry.find_prefix_matches(partial, max)
    }

    pub fn enable_auto_connect(&mut self) -> Vec<Step> {
        self.autoconnect.enable()
    }

    pub fn tick(&mut self) -> Vec<Step> {
        self.autoconnect.tick()
    }

    /// Explicit disconnect from the user.
    pub fn user_disconnect(&mut self) {
        vlog!("user disconnect from {}", self.display_name());
        self.autoconnect.disable();
        self.teardown();
    }

    /// Drop everything tied to the current connection.
    pub fn teardown(&mut self) {
        if self.registry.remote_len() > 0 || self.connection.has_transport() {
            vlog_debug!(
                "teardown: {:?}, {} remote commands",
                self.connection,
                self.registry.remote_len()
            );
        }
        self.registry.clear_remote();
        self.connection = ConnectionState::Disconnected;
        self.info = None;
    }

    pub fn on_listen(&mut self, outcome: &ListenOutcome) -> Vec<Step> {
        let result = match outcome {
            ListenOutcome::Session(_) => LinkResult::Session,
            ListenOutcome::TransportOnly(_) => LinkResult::TransportOnly,
            ListenOutcome::Failed(_) => LinkResult::Failed,
        };
        let steps = self.autoconnect.on_link(result);
        if steps.contains(&Step::Discard) {
            return steps;
        }

        match outcome {
            ListenOutcome::Session(info) => {
                self.registry.clear_remote();
                self.data.clear();
                self.connection = ConnectionState::ConnectedWithSession;
                self.info = Some(info.clone());
                self.connect_count += 1;
            }
            ListenOutcome::TransportOnly(info) => {
                self.registry.clear_remote();
                self.connection = ConnectionState::ConnectedTransportOnly;
                self.info = Some(info.clone());
            }
            ListenOutcome::Failed(reason) => {
                vlog_debug!("connect failed: {}", reason);
                self.teardown();
            }
        }
        steps
    }

    pub fn on_ping(&mut self, outcome: &PingOutcome) -> Vec<Step> {
        let result = match outcome {
            PingOutcome::Alive => PingResult::Alive,
            PingOutcome::Busy => PingResult::Busy,
            PingOutcome::Lost(_) => PingResult::Lost,
        };
        let steps = self.autoconnect.on_ping(result);
        if steps.contains(&Step::Notice(Notice::ConnectionLost)) {
            self.teardown();
        }
        steps
    }

    /// The target's `Disconnect()` has been acknowledged.
    pub fn on_remote_disconnect(&mut self) {
        self.autoconnect.on_remote_disconnect();
        self.teardown();
    }

    /// Apply one routed notification.
    pub fn handle_notification(&mut self, notification: Notification) -> Handled {
        let expects_ack = notification.expects_ack();
        let mut handled = Handled::default();

        match notification {
            Notification::Print { color, text } => {
                handled.lines.push(ConsoleLine::colored(text, color));
            }
            Notification::Debug { text } => {
                handled.lines.push(ConsoleLine::normal(text));
            }
            Notification::Event(event) => {
                handled.ack = Some(0);
                self.apply_event(event, &mut handled);
            }
            Notification::Malformed { verb, detail } => {
                handled.lines.push(ConsoleLine::error(detail));
                vlog_warn!("malformed {} from target", verb);
                handled.ack = Some(1);
            }
            Notification::Unrecognized { raw } => {
                vlog_warn!("unrecognized notification {:?}", raw);
                handled.lines.push(ConsoleLine::error(
                    Error::protocol("notification", format!("unrecognized '{}'", raw))
                        .to_string(),
                ));
                handled.ack = Some(1);
            }
        }

        if !expects_ack {
            handled.ack = None;
        }
        handled
    }

    fn apply_event(&mut self, event: TargetEvent, handled: &mut Handled) {
        match event {
            TargetEvent::AddCommands(pairs) => {
                let offered = pairs.len();
                let added = pairs
                    .iter()
                    .filter(|(name, help)| self.registry.register_remote(name, help))
                    .count();
                vlog_debug!("AddCommands: {} offered, {} new", offered, added);
            }
            TargetEvent::SetProfile(labels) => self.data.set_profile_labels(labels),
            TargetEvent::SetProfileData(samples) => self.data.set_profile_samples(samples),
            TargetEvent::ResourceList { kind, entries } => self.data.set_resources(kind, entries),
            TargetEvent::TimeStampLog(stamp) => self.data.push_timestamp(stamp),
            TargetEvent::MemDump { path } => {
                handled
                    .lines
                    .push(ConsoleLine::notice(format!("Memory dump written to {}", path)));
                self.data.set_last_dump(path);
            }
            TargetEvent::MapInfo(pairs) => self.data.set_map_info(pairs),
            TargetEvent::Assert { message } => {
                handled.lines.push(ConsoleLine::error(format!("Assert: {}", message)));
                handled.ack = Some(self.assert_policy.code());
            }
            TargetEvent::FreeMemory(bytes) => self.data.push_free_memory(bytes),
            TargetEvent::Disconnect => {
                handled
                    .lines
                    .push(ConsoleLine::notice("Target application disconnected."));
                handled.target_disconnected = true;
            }
        }
    }
}
