//! Integration test suite for vxconsole.
//!
//! These tests drive the public API end to end: lines typed at the console
//! resolved against the registry, notifications classified and applied to
//! a session, the auto-connect lifecycle, the request gate under
//! contention, and the one-shot `exec` path over a real socket.
//!
//! # Test Categories
//!
//! - `dispatch`: Tokenizing and resolving console lines
//! - `router`: Notification classification and session effects
//! - `autoconnect`: Connect, ping, back-off and give-up cycles
//! - `console`: Keys through `update`, and settings across a restart
//! - `gate`: Single-flight behavior with concurrent callers
//! - `headless`: `exec` against a fake TCP target
//!
//! # CI Compatibility
//!
//! Targets are either in-process or a loopback listener on an ephemeral
//! port, so nothing here needs hardware or network access.

mod fixtures;

mod autoconnect;
mod console;
mod dispatch;
mod gate;
mod router;
