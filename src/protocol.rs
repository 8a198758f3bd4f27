//! Wire vocabulary shared by the router, the remote client and the transports.
//!
//! Inbound notifications carry one of three prefixes:
//!
//! ```text
//! XCMD!<verb> <payload>           command from the target
//! XPRT!XCLR[00ff8000]<text>       print, optional color
//! debugstr <text>                 debug string
//! ```
//!
//! Outbound commands are plain text. `XCMD!` in front routes a line to the
//! target's own command processor; a leading `*` sends the rest of the line
//! straight to the transport.

use crate::{Error, Result};

pub const COMMAND_PREFIX: &str = "XCMD!";
pub const PRINT_PREFIX: &str = "XPRT!";
pub const DEBUG_PREFIX: &str = "debugstr ";
pub const COLOR_PREFIX: &str = "XCLR";
/// Marker some targets put in front of a textual response.
pub const ACK_PREFIX: &str = "XACK";
/// Leading character of a local command; also the direct-route marker.
pub const DIRECT_MARKER: char = '*';

pub const PROTOCOL_VERSION: u32 = 1;

/// Completion acknowledgement sent after a synchronous routed notification.
pub fn completion_command(code: i32) -> String {
    format!("{}__complete__{}", COMMAND_PREFIX, code)
}

/// First command sent once a session is open, so the target knows we are here.
pub fn connect_command() -> String {
    format!("{}__connect__ {}", COMMAND_PREFIX, PROTOCOL_VERSION)
}

/// Sent when the user closes a session, so the application stops talking to us.
pub fn disconnect_command() -> String {
    format!("{}__disconnect__", COMMAND_PREFIX)
}

pub fn memory_command() -> String {
    format!("{}__memory__", COMMAND_PREFIX)
}

/// Empty routed command, used as a liveness probe.
pub fn ping_command() -> &'static str {
    COMMAND_PREFIX
}

pub fn is_ping(command: &str) -> bool {
    command.eq_ignore_ascii_case(COMMAND_PREFIX)
}

/// A 24-bit console color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Width of the hex color field between the brackets.
const COLOR_DIGITS: usize = 8;

/// Strip an `XCLR[xxxxxxxx]` color tag from the start of `text`.
///
/// Returns `Ok(None)` when there is no tag at all, so callers can tell a
/// missing color from a malformed one.
pub fn strip_color(text: &str) -> Result<Option<(Rgb, &str)>> {
    let Some(after) = text.strip_prefix(COLOR_PREFIX) else {
        return Ok(None);
    };
    let malformed = || Error::protocol("color", format!("bad color tag in {:?}", text));

    let body = after.strip_prefix('[').ok_or_else(malformed)?;
    if body.len() < COLOR_DIGITS + 1 || !body.is_char_boundary(COLOR_DIGITS) {
        return Err(malformed());
    }
    let (digits, rest) = body.split_at(COLOR_DIGITS);
    let rest = rest.strip_prefix(']').ok_or_else(malformed)?;
    let value = u32::from_str_radix(digits, 16).map_err(|_| malformed())?;

    let rgb = Rgb::new((value >> 16) as u8, (value >> 8) as u8, value as u8);
    Ok(Some((rgb, rest)))
}

/// Encode a color tag; the inverse of [`strip_color`].
pub fn color_tag(rgb: Rgb) -> String {
    let value = (u32::from(rgb.r) << 16) | (u32::from(rgb.g) << 8) | u32::from(rgb.b);
    format!("{}[{:08x}]", COLOR_PREFIX, value)
}

/// Closed set of commands a target may push at the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    AddCommands,
    SetProfile,
    SetProfileData,
    TextureList,
    MaterialList,
    SoundList,
    TimeStampLog,
    MemDump,
    MapInfo,
    Assert,
    FreeMemory,
    Disconnect,
}

impl Verb {
    pub const ALL: [Verb; 12] = [
        Verb::AddCommands,
        Verb::SetProfile,
        Verb::SetProfileData,
        Verb::TextureList,
        Verb::MaterialList,
        Verb::SoundList,
        Verb::TimeStampLog,
        Verb::MemDump,
        Verb::MapInfo,
        Verb::Assert,
        Verb::FreeMemory,
        Verb::Disconnect,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Verb::AddCommands => "AddCommands()",
            Verb::SetProfile => "SetProfile()",
            Verb::SetProfileData => "SetProfileData()",
            Verb::TextureList => "TextureList()",
            Verb::MaterialList => "MaterialList()",
            Verb::SoundList => "SoundList()",
            Verb::TimeStampLog => "TimeStampLog()",
            Verb::MemDump => "MemDump()",
            Verb::MapInfo => "MapInfo()",
            Verb::Assert => "Assert()",
            Verb::FreeMemory => "FreeMemory()",
            Verb::Disconnect => "Disconnect()",
        }
    }

    pub fn from_wire(token: &str) -> Option<Verb> {
        Verb::ALL
            .into_iter()
            .find(|v| v.wire_name().eq_ignore_ascii_case(token))
    }

    /// High-rate verbs are fire-and-forget: acknowledging them would keep
    /// the single request slot permanently occupied.
    pub fn is_async(&self) -> bool {
        matches!(self, Verb::SetProfileData | Verb::FreeMemory)
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}
