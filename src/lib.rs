//! distillery - install any binary from ideally any source
//!
//! Resolves a short reference like `owner/repo@version` against a release
//! source, picks the right asset for the running platform, verifies it,
//! and installs it under a user-owned directory with stable symlinks.

pub mod cmd;
pub mod config;
pub mod core;
pub mod inventory;
pub mod io;
pub mod source;
pub mod verify;

/// Application name, used for directory naming and user agents.
pub const NAME: &str = "distillery";

/// User agent sent on every outbound request.
pub const USER_AGENT: &str = concat!("distillery/", env!("CARGO_PKG_VERSION"));

/// The `latest` version sentinel accepted everywhere a version is.
pub const VERSION_LATEST: &str = "latest";
