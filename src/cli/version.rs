//! Version command for the tether CLI.

/// The current version of tether, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version line printed by `tether --version`.
pub fn version_line() -> String {
    format!("tether {}", VERSION)
}
