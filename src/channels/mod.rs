//! Messenger and notifier implementations.

pub mod cli;
pub mod recording;

pub use cli::{CliChannel, CliCommand};
pub use recording::{RecordingChannel, Sent};
