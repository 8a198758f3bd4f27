use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::settings::{keys, SettingsStore};
use crate::{vlog_debug, Error, Result};

/// How the console answers an `Assert()` notification from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssertPolicy {
    /// Let the target carry on.
    #[default]
    Continue,
    /// Ask the target to break into the debugger.
    Break,
}

impl AssertPolicy {
    /// Result code carried by the completion acknowledgement.
    pub fn code(&self) -> i32 {
        match self {
            AssertPolicy::Continue => 0,
            AssertPolicy::Break => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target to connect to (`host` or `host:port`). Empty means localhost.
    pub target: String,
    /// Start auto-connecting at launch.
    pub auto_connect: bool,
    pub tick_interval_ms: u64,
    /// Ticks between liveness pings while a session is active.
    pub ping_ticks: u32,
    /// Ticks to wait when the target answers but its application does not.
    pub retry_ticks: u32,
    /// Ticks to wait after the first failed connect, to let a target boot.
    pub boot_ticks: u32,
    pub history_limit: usize,
    pub scrollback_limit: usize,
    pub capture_game_spew: bool,
    pub capture_debug_spew: bool,
    pub cls_on_connect: bool,
    /// Mirror console output into a per-target transcript file.
    pub playtest_mode: bool,
    pub assert_policy: AssertPolicy,
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: String::new(),
            auto_connect: false,
            tick_interval_ms: 1000,
            ping_ticks: 3,
            retry_ticks: 3,
            boot_ticks: 15,
            history_limit: 50,
            scrollback_limit: 5000,
            capture_game_spew: true,
            capture_debug_spew: true,
            cls_on_connect: false,
            playtest_mode: false,
            assert_policy: AssertPolicy::Continue,
            request_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn data_dir() -> Result<PathBuf> {
        crate::log::data_dir().ok_or(Error::NoHomeDir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("vxconsole.toml"))
    }

    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("settings.json"))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        vlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            vlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        vlog_debug!(
            "Config loaded: target={:?} auto_connect={} ticks={}/{}/{}",
            config.target,
            config.auto_connect,
            config.ping_ticks,
            config.retry_ticks,
            config.boot_ticks
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        vlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Overlay what the user changed at runtime last time.
    pub fn apply_settings(&mut self, settings: &dyn SettingsStore) {
        if let Some(target) = settings.get(keys::LAST_TARGET) {
            self.target = target;
        }
        self.auto_connect = settings.get_bool(keys::AUTO_CONNECT, self.auto_connect);
        self.capture_game_spew = settings.get_bool(keys::CAPTURE_GAME_SPEW, self.capture_game_spew);
        self.capture_debug_spew =
            settings.get_bool(keys::CAPTURE_DEBUG_SPEW, self.capture_debug_spew);
        self.playtest_mode = settings.get_bool(keys::PLAYTEST_MODE, self.playtest_mode);
    }

    fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(Error::Validation("history_limit must be at least 1".into()));
        }
        if self.scrollback_limit == 0 {
            return Err(Error::Validation(
                "scrollback_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
