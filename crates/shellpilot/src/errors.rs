//! Exit codes for shellpilot

/// Normal termination (exit, quit, EOF, Ctrl+C)
pub const EXIT_SUCCESS: i32 = 0;

/// Unrecoverable error reading input or writing output
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Configuration could not be loaded or written
pub const EXIT_CONFIG_ERROR: i32 = 78;

/// The selected backend cannot be used (missing credential, unknown name)
pub const EXIT_PROVIDER_UNAVAILABLE: i32 = 69;
