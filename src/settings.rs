//! Persistent user settings.
//!
//! Small string key/value store for things the console remembers between
//! runs: the last target, the terminal size and the user's toggles.
//! [`JsonSettings`] keeps them in `~/.vxconsole/settings.json`;
//! [`MemorySettings`] keeps them nowhere.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{vlog_debug, vlog_warn, Result};

pub mod keys {
    pub const LAST_TARGET: &str = "last_target";
    pub const WINDOW_SIZE: &str = "window_size";
    pub const AUTO_CONNECT: &str = "auto_connect";
    pub const CAPTURE_GAME_SPEW: &str = "capture_game_spew";
    pub const CAPTURE_DEBUG_SPEW: &str = "capture_debug_spew";
    pub const PLAYTEST_MODE: &str = "playtest_mode";
}

pub trait SettingsStore: Send {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str);

    /// Persist pending changes.
    fn flush(&mut self) -> Result<()>;

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).as_deref() {
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            _ => default,
        }
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, if value { "1" } else { "0" });
    }

    /// `WIDTHxHEIGHT`, as stored under [`keys::WINDOW_SIZE`].
    fn window_size(&self) -> Option<(u16, u16)> {
        let value = self.get(keys::WINDOW_SIZE)?;
        let (w, h) = value.split_once('x')?;
        Some((w.parse().ok()?, h.parse().ok()?))
    }

    fn set_window_size(&mut self, width: u16, height: u16) {
        self.set(keys::WINDOW_SIZE, &format!("{}x{}", width, height));
    }
}

/// Settings held in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Settings persisted as a flat JSON object.
#[derive(Debug, Clone)]
pub struct JsonSettings {
    path: PathBuf,
    values: BTreeMap<String, String>,
    dirty: bool,
}

impl JsonSettings {
    /// Load from `path`. A missing file is an empty store; an unreadable
    /// one falls back to the backup written by the previous save.
    pub fn load(path: &Path) -> Result<Self> {
        vlog_debug!("JsonSettings::load path={}", path.display());
        let values = if path.exists() {
            match read_values(path) {
                Ok(values) => values,
                Err(e) => {
                    let backup = backup_path(path);
                    vlog_warn!(
                        "settings file unreadable ({}), trying {}",
                        e,
                        backup.display()
                    );
                    if backup.exists() {
                        read_values(&backup)?
                    } else {
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

fn read_values(path: &Path) -> Result<BTreeMap<String, String>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn backup_path(path: &Path) -> PathBuf {
    path.with_extension("json.bak")
}

impl SettingsStore for JsonSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        if self.values.get(key).map(String::as_str) != Some(value) {
            self.values.insert(key.to_string(), value.to_string());
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        if self.path.exists() {
            fs::copy(&self.path, backup_path(&self.path))?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(&self.values)?)?;
        fs::rename(&temp_path, &self.path)?;
        self.dirty = false;
        vlog_debug!("Settings saved: {}", self.path.display());
        Ok(())
    }
}
