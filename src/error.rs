use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("'{0}' is not a recognized command.")]
    UnknownCommand(String),

    #[error("'{command}' is not available until connected to {requirement}.")]
    NotYetAvailable {
        command: String,
        requirement: &'static str,
    },

    #[error("Transport busy: another request is still in flight")]
    TransportBusy,

    #[error("Transport failure: {reason}")]
    TransportFailure { reason: String },

    #[error("Transport failure: 0x{0:08x}")]
    TransportCode(u32),

    #[error("Protocol violation in {verb}: {detail}")]
    ProtocolViolation { verb: String, detail: String },

    #[error("Not connected")]
    NotConnected,

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl Error {
    /// Build a transport failure from a human-readable reason.
    pub fn transport(reason: impl Into<String>) -> Self {
        Error::TransportFailure {
            reason: reason.into(),
        }
    }

    pub fn protocol(verb: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::ProtocolViolation {
            verb: verb.into(),
            detail: detail.into(),
        }
    }

    /// Errors that are reported as a console line and never end the process.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnknownCommand(_)
                | Error::NotYetAvailable { .. }
                | Error::TransportBusy
                | Error::TransportFailure { .. }
                | Error::TransportCode(_)
                | Error::ProtocolViolation { .. }
                | Error::NotConnected
                | Error::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
