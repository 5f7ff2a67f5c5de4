//! I/O helpers for board commands.

pub mod config;
pub mod paths;
pub mod process;
pub mod settings;
