//! Pieces of the `metronome` binary: configuration, logging setup, the
//! subcommand implementations and the `warn` argument parser.

pub mod commands;
pub mod config;
pub mod logging;
pub mod values;

/// Version reported by `--version`, stamped by the build script
pub const VERSION: &str = env!("VERSION_STRING");
