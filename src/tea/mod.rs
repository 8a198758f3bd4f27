//! The Elm Architecture (TEA) implementation for the console.
//!
//! - `Model`: console state, including the target [`Session`](crate::session::Session)
//! - `Message`: inputs to the update function
//! - `Command`: side effects the logic thread carries out
//! - `update`: transforms the model, never touches the transport

pub mod command;
pub mod message;
pub mod model;
pub mod update;

pub use command::Command;
pub use message::Message;
pub use model::{History, Model};
pub use update::{update, MAX_HINTS};
