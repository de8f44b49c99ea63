//! Command-line interface for syncplayer.
//!
//! Diagnostic commands for inspecting tags, pulling out album art and
//! running a file through the playback resource manager.

mod commands;

pub use commands::{Cli, Commands, run_command};
