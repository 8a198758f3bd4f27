pub mod autoconnect;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod headless;
pub mod log;
pub mod output;
pub mod protocol;
pub mod remote;
pub mod session;
pub mod settings;
pub mod target_data;
pub mod util;

// Decoupled game loop architecture
pub mod actors;
pub mod app;
pub mod render;
pub mod tea;
pub mod ui;

pub use error::{Error, Result};
pub use session::{ConnectionState, Session};
