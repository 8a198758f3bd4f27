//! Built-in console commands.
//!
//! Order here is the order `*help` lists them in.

use super::registry::{CommandFlags, Handler};

/// Work a local command does on the logic thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalAction {
    Cls,
    Connect,
    Disconnect,
    Help,
    Quit,
    Memory,
    Profile,
    TimeStamps,
    FreeMem,
    MapInfo,
    Resources,
    Spew,
}

/// One row of the built-in table.
#[derive(Debug, Clone, Copy)]
pub struct LocalCommand {
    pub name: &'static str,
    pub flags: CommandFlags,
    pub handler: Handler,
    pub help: &'static str,
}

const fn local(
    name: &'static str,
    flags: CommandFlags,
    action: LocalAction,
    help: &'static str,
) -> LocalCommand {
    LocalCommand {
        name,
        flags,
        handler: Handler::Local(action),
        help,
    }
}

/// Forwarded to the target's debug monitor as typed.
const fn xcommand(name: &'static str, help: &'static str) -> LocalCommand {
    LocalCommand {
        name,
        flags: CommandFlags::TRANSPORT,
        handler: Handler::PassThrough,
        help,
    }
}

pub const LOCAL_COMMANDS: &[LocalCommand] = &[
    local("*cls", CommandFlags::NONE, LocalAction::Cls, ": Clear the console"),
    local(
        "*connect",
        CommandFlags::NONE,
        LocalAction::Connect,
        "[target] : Connect to target, enabling auto-connect",
    ),
    local(
        "*disconnect",
        CommandFlags::NONE,
        LocalAction::Disconnect,
        ": Disconnect and stop auto-connect",
    ),
    local(
        "*help",
        CommandFlags::NONE,
        LocalAction::Help,
        "[command] : List commands/usage",
    ),
    local("*quit", CommandFlags::NONE, LocalAction::Quit, ": Terminate console"),
    local(
        "*memory",
        CommandFlags::SESSION,
        LocalAction::Memory,
        ": Dump Memory Stats",
    ),
    local(
        "*profile",
        CommandFlags::NONE,
        LocalAction::Profile,
        ": Show the latest profile samples",
    ),
    local(
        "*timestamps",
        CommandFlags::NONE,
        LocalAction::TimeStamps,
        ": Show the time stamp log",
    ),
    local(
        "*freemem",
        CommandFlags::NONE,
        LocalAction::FreeMem,
        ": Show free memory samples",
    ),
    local(
        "*mapinfo",
        CommandFlags::NONE,
        LocalAction::MapInfo,
        ": Show the last reported map info",
    ),
    local(
        "*resources",
        CommandFlags::NONE,
        LocalAction::Resources,
        "[textures|materials|sounds] : Show reported resource lists",
    ),
    local(
        "*spew",
        CommandFlags::NONE,
        LocalAction::Spew,
        "[game|debug] [on|off] : Show or toggle output capture",
    ),
    xcommand(
        "*break",
        " addr=<address> | 'Write'/'Read'/'Execute'=<address> size=<DataSize> ['clear']: Sets/Clears a breakpoint",
    ),
    xcommand(
        "*continue",
        " thread=<threadid>: Resumes execution of a thread which has been stopped",
    ),
    xcommand(
        "*getcontext",
        " thread=<threadid> 'Control' | 'Int' | 'FP' | 'Full':  Gets the context of the thread",
    ),
    xcommand("*getfileattributes", " name=<remotefile>: Gets attributes of a file"),
    xcommand("*getmem", " addr=<address> length=<len>: Reads memory from the target"),
    xcommand("*go", ": Resumes suspended title threads"),
    xcommand("*halt", " thread=<threadid> Breaks a thread"),
    xcommand(
        "*isstopped",
        " thread=<threadid>: Determines if a thread is stopped and why",
    ),
    xcommand("*mkdir", " name=<remotedir>: Creates a new directory on the target"),
    xcommand("*modlong", " name=<module>: Lists the long name of the module"),
    xcommand(
        "*rename",
        " name=<remotefile> newname=<newname>: Renames a file on the target",
    ),
    xcommand("*resume", " thread=<threadid>: Resumes thread execution"),
    xcommand("*setcontext", " thread=<threadid>: Sets the context of the thread."),
    xcommand(
        "*setfileattributes",
        " <remotefile> <attrs>: Sets attributes of a file",
    ),
    xcommand("*setmem", " addr=<address> data=<rawdata>: Sets memory on the target"),
    xcommand("*stop", ": Stops the process"),
    xcommand("*suspend", " thread=<threadid>: Suspends the thread"),
    xcommand("*systime", ": Gets the system time of the target"),
    xcommand("*threadinfo", " thread=<threadid>: Gets thread info"),
    xcommand("*threads", ": Gets the thread list"),
    xcommand("*xexinfo", " name=<remotexex | 'running'>: Gets info on an executable"),
];
