//! Local and remote command tables.
//!
//! Local commands are fixed at startup and keep their table order. Remote
//! commands arrive from the target in an `AddCommands()` notification, are
//! kept sorted by case-insensitive name and are dropped wholesale whenever
//! the session ends.

use std::collections::BTreeMap;

use super::local::{LocalAction, LOCAL_COMMANDS};
use super::tokenizer::tokenize;
use crate::protocol::COMMAND_PREFIX;
use crate::session::ConnectionState;
use crate::util::starts_with_ignore_case;
use crate::{vlog_debug, vlog_warn, Error, Result};

/// Connection a command needs before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandFlags {
    pub requires_transport: bool,
    pub requires_session: bool,
}

impl CommandFlags {
    pub const NONE: CommandFlags = CommandFlags {
        requires_transport: false,
        requires_session: false,
    };
    pub const TRANSPORT: CommandFlags = CommandFlags {
        requires_transport: true,
        requires_session: false,
    };
    pub const SESSION: CommandFlags = CommandFlags {
        requires_transport: true,
        requires_session: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Runs on the console itself.
    Local(LocalAction),
    /// Line goes to the transport as typed.
    PassThrough,
    /// Line goes to the target application behind the routing prefix.
    RemoteForward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub flags: CommandFlags,
    pub handler: Handler,
    pub help: String,
}

/// Where a dispatched line ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Local {
        action: LocalAction,
        args: Vec<String>,
    },
    Forward {
        wire: String,
    },
}

#[derive(Debug, Clone)]
pub struct CommandRegistry {
    local: Vec<Command>,
    /// Keyed by lowercased name, which also gives the sort order.
    remote: BTreeMap<String, Command>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CommandRegistry {
    /// A registry with no commands at all.
    pub fn empty() -> Self {
        Self {
            local: Vec::new(),
            remote: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in console table.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for cmd in LOCAL_COMMANDS {
            registry.register_local(cmd.name, cmd.flags, cmd.handler, cmd.help);
        }
        registry
    }

    /// Add a local command. Local names are unique; a duplicate is a bug in
    /// the caller and the first definition is kept.
    pub fn register_local(&mut self, name: &str, flags: CommandFlags, handler: Handler, help: &str) {
        let duplicate = self.find_local(name).is_some();
        debug_assert!(!duplicate, "local command '{}' registered twice", name);
        if duplicate {
            return;
        }
        self.local.push(Command {
            name: name.to_string(),
            flags,
            handler,
            help: help.to_string(),
        });
    }

    /// Add a command announced by the target. Returns `false` when the name
    /// is already known, in which case the existing entry is left alone.
    pub fn register_remote(&mut self, name: &str, help: &str) -> bool {
        let key = name.to_ascii_lowercase();
        if self.remote.contains_key(&key) {
            vlog_debug!("register_remote: '{}' already registered", name);
            return false;
        }
        self.remote.insert(
            key,
            Command {
                name: name.to_string(),
                flags: CommandFlags::SESSION,
                handler: Handler::RemoteForward,
                help: help.to_string(),
            },
        );
        true
    }

    pub fn clear_remote(&mut self) {
        if !self.remote.is_empty() {
            vlog_debug!("clear_remote: dropping {} commands", self.remote.len());
        }
        self.remote.clear();
    }

    pub fn local_commands(&self) -> &[Command] {
        &self.local
    }

    /// Remote commands in name order.
    pub fn remote_commands(&self) -> impl Iterator<Item = &Command> {
        self.remote.values()
    }

    pub fn remote_len(&self) -> usize {
        self.remote.len()
    }

    pub fn find_local(&self, name: &str) -> Option<&Command> {
        self.local.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn find_remote(&self, name: &str) -> Option<&Command> {
        self.remote.get(&name.to_ascii_lowercase())
    }

    /// Names from both tables that start with `partial`, sorted
    /// case-insensitively and capped at `max`.
    pub fn find_prefix_matches(&self, partial: &str, max: usize) -> Vec<String> {
        let mut names: Vec<&str> = self
            .local
            .iter()
            .chain(self.remote.values())
            .map(|c| c.name.as_str())
            .filter(|name| starts_with_ignore_case(name, partial))
            .collect();
        names.sort_by_key(|name| name.to_ascii_lowercase());
        names.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        names.truncate(max);
        names.into_iter().map(str::to_string).collect()
    }

    /// Work out where a typed line should go.
    ///
    /// `Ok(None)` means there was nothing to run (blank line or only a
    /// comment). Local commands shadow remote ones, and remote commands are
    /// only consulted while the target application is attached.
    pub fn resolve(&self, line: &str, connection: ConnectionState) -> Result<Option<Route>> {
        let mut args = tokenize(line);
        if args.is_empty() {
            return Ok(None);
        }
        let name = args.remove(0);

        let command = self.find_local(&name).or_else(|| {
            if connection.has_session() {
                self.find_remote(&name)
            } else {
                None
            }
        });
        let Some(command) = command else {
            vlog_debug!("resolve: unknown command '{}'", name);
            return Err(Error::UnknownCommand(name));
        };

        check_available(command, connection)?;

        let route = match command.handler {
            Handler::Local(action) => Route::Local { action, args },
            Handler::PassThrough => Route::Forward {
                wire: line.trim().to_string(),
            },
            Handler::RemoteForward => Route::Forward {
                wire: format!("{}{}", COMMAND_PREFIX, line.trim()),
            },
        };
        vlog_debug!("resolve: '{}' -> {:?}", command.name, route);
        Ok(Some(route))
    }

    /// Lines printed by `*help`.
    pub fn help_lines(&self, topic: Option<&str>, session_active: bool) -> Vec<String> {
        let mut lines = Vec::new();
        match topic {
            None => {
                lines.push(String::new());
                lines.push("Console Commands:".to_string());
                lines.push("---------------".to_string());
                lines.extend(self.local.iter().map(|c| c.name.clone()));

                if session_active {
                    lines.push(format!("Remote Commands: ( {} )", self.remote.len()));
                    lines.push("----------------".to_string());
                    if self.remote.is_empty() {
                        lines.push("( None )".to_string());
                    } else {
                        lines.extend(self.remote.values().map(|c| c.name.clone()));
                    }
                    lines.push(String::new());
                }
            }
            Some(prefix) => {
                let matching = |c: &&Command| starts_with_ignore_case(&c.name, prefix);
                for cmd in self.local.iter().filter(matching) {
                    lines.push(format!("{} {}", cmd.name, cmd.help));
                }
                if session_active {
                    for cmd in self.remote.values().filter(matching) {
                        lines.push(format!("{} {}", cmd.name, cmd.help));
                    }
                }
                lines.push(String::new());
            }
        }
        lines
    }
}

fn check_available(command: &Command, connection: ConnectionState) -> Result<()> {
    let requirement = if command.flags.requires_session && !connection.has_session() {
        Some("Application")
    } else if command.flags.requires_transport && !connection.has_transport() {
        Some("Target")
    } else {
        None
    };
    match requirement {
        Some(requirement) => {
            vlog_warn!(
                "'{}' needs {} but connection is {:?}",
                command.name,
                requirement,
                connection
            );
            Err(Error::NotYetAvailable {
                command: command.name.clone(),
                requirement,
            })
        }
        None => Ok(()),
    }
}
