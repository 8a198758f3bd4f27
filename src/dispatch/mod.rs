//! Turning typed lines into work: tokenizing, command tables and routing.

pub mod local;
pub mod registry;
pub mod tokenizer;

pub use local::{LocalAction, LocalCommand, LOCAL_COMMANDS};
pub use registry::{Command, CommandFlags, CommandRegistry, Handler, Route};
pub use tokenizer::{split_first, tokenize, Tokenizer, MAX_ARGS, MAX_TOKEN_LEN};
