//! Stable exit codes for `macroboard` CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// The config file could not be read, parsed or validated.
pub const INVALID_CONFIG: i32 = 1;
/// The session failed after the config was accepted (settings, engine start-up).
pub const RUNTIME: i32 = 2;
