//! Timer-driven connection lifecycle.
//!
//! The machine never touches the transport. It consumes ticks and the
//! results of connect and ping attempts, and answers with [`Step`]s the
//! logic thread carries out. Only one attempt is ever in flight; ticks that
//! arrive meanwhile are skipped, not queued.

use crate::config::Config;
use crate::vlog_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub ping_ticks: u32,
    pub retry_ticks: u32,
    pub boot_ticks: u32,
    /// Length of one tick, for the boot countdown.
    pub tick_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            ping_ticks: 3,
            retry_ticks: 3,
            boot_ticks: 15,
            tick_ms: 1000,
        }
    }
}

impl From<&Config> for Timing {
    fn from(config: &Config) -> Self {
        Self {
            ping_ticks: config.ping_ticks.max(1),
            retry_ticks: config.retry_ticks,
            boot_ticks: config.boot_ticks,
            tick_ms: config.tick_interval_ms.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Connecting,
    SessionActive { next_ping: u32 },
    Backoff { remaining: u32 },
}

/// Result of a connect attempt, as far as the machine cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkResult {
    Session,
    TransportOnly,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingResult {
    Alive,
    Busy,
    Lost,
}

/// Things the machine wants said in the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// First failure; waiting for the target to boot.
    Waiting,
    /// Still waiting for boot.
    Remaining { seconds: u64 },
    GaveUp,
    ConnectionLost,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::Waiting => "Waiting for target...".to_string(),
            Notice::Remaining { seconds } => {
                format!("Waiting... {} seconds remaining", seconds)
            }
            Notice::GaveUp => "Auto-connect giving up, target not found.".to_string(),
            Notice::ConnectionLost => "Connection To Target Lost.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Connect,
    Ping,
    /// A result arrived after the user disconnected; close what it opened.
    Discard,
    Notice(Notice),
}

#[derive(Debug, Clone)]
pub struct AutoConnect {
    state: State,
    enabled: bool,
    failures: u32,
    in_flight: bool,
    timing: Timing,
}

impl AutoConnect {
    pub fn new(timing: Timing) -> Self {
        Self {
            state: State::Idle,
            enabled: false,
            failures: 0,
            in_flight: false,
            timing,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    fn transition(&mut self, to: State) {
        if self.state != to {
            vlog_debug!("autoconnect: {:?} -> {:?}", self.state, to);
        }
        self.state = to;
    }

    /// Enter `Connecting` and ask for an attempt, unless one is already
    /// running, in which case its result is adopted.
    fn start_connect(&mut self) -> Vec<Step> {
        self.transition(State::Connecting);
        if self.in_flight {
            return Vec::new();
        }
        self.in_flight = true;
        vec![Step::Connect]
    }

    /// Turn auto-connect on. Connects straight away from `Idle`.
    pub fn enable(&mut self) -> Vec<Step> {
        self.enabled = true;
        self.failures = 0;
        match self.state {
            State::Idle => self.start_connect(),
            _ => Vec::new(),
        }
    }

    /// User disconnect: back to `Idle` with auto-connect off.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.failures = 0;
        self.transition(State::Idle);
    }

    pub fn tick(&mut self) -> Vec<Step> {
        if self.in_flight {
            vlog_debug!("autoconnect: tick skipped, attempt in flight");
            return Vec::new();
        }
        match self.state {
            State::Idle => Vec::new(),
            State::Connecting => self.start_connect(),
            State::SessionActive { next_ping } => {
                let next_ping = next_ping.saturating_sub(1);
                if next_ping == 0 {
                    self.in_flight = true;
                    self.transition(State::SessionActive { next_ping: 0 });
                    vec![Step::Ping]
                } else {
                    self.transition(State::SessionActive { next_ping });
                    Vec::new()
                }
            }
            State::Backoff { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    return self.start_connect();
                }
                self.transition(State::Backoff { remaining });
                // Only the boot wait after a first failure counts down aloud.
                if self.failures == 1 {
                    let seconds = u64::from(remaining) * self.timing.tick_ms / 1000;
                    vec![Step::Notice(Notice::Remaining { seconds })]
                } else {
                    Vec::new()
                }
            }
        }
    }

    pub fn on_link(&mut self, result: LinkResult) -> Vec<Step> {
        self.in_flight = false;
        if self.state != State::Connecting {
            vlog_debug!("autoconnect: discarding {:?}, no longer connecting", result);
            return match result {
                LinkResult::Failed => Vec::new(),
                _ => vec![Step::Discard],
            };
        }

        match result {
            LinkResult::Session => {
                self.failures = 0;
                self.transition(State::SessionActive {
                    next_ping: self.timing.ping_ticks,
                });
                Vec::new()
            }
            LinkResult::TransportOnly => {
                self.failures = 0;
                self.transition(State::Backoff {
                    remaining: self.timing.retry_ticks,
                });
                Vec::new()
            }
            LinkResult::Failed => {
                self.failures += 1;
                if self.failures == 1 {
                    self.transition(State::Backoff {
                        remaining: self.timing.boot_ticks,
                    });
                    vec![Step::Notice(Notice::Waiting)]
                } else {
                    self.enabled = false;
                    self.failures = 0;
                    self.transition(State::Idle);
                    vec![Step::Notice(Notice::GaveUp)]
                }
            }
        }
    }

    pub fn on_ping(&mut self, result: PingResult) -> Vec<Step> {
        self.in_flight = false;
        if !matches!(self.state, State::SessionActive { .. }) {
            return Vec::new();
        }
        match result {
            PingResult::Alive | PingResult::Busy => {
                self.transition(State::SessionActive {
                    next_ping: self.timing.ping_ticks,
                });
                Vec::new()
            }
            PingResult::Lost => {
                self.transition(State::Idle);
                let mut steps = vec![Step::Notice(Notice::ConnectionLost)];
                if self.enabled {
                    steps.extend(self.start_connect());
                }
                steps
            }
        }
    }

    /// The target announced it is going away. Treated like an absent
    /// application: wait the retry delay, then try again.
    pub fn on_remote_disconnect(&mut self) {
        if !matches!(self.state, State::SessionActive { .. }) {
            return;
        }
        if self.enabled {
            self.transition(State::Backoff {
                remaining: self.timing.retry_ticks,
            });
        } else {
            self.transition(State::Idle);
        }
    }
}
