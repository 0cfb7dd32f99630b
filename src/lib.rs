#![allow(clippy::module_name_repetitions)]
//! docker-step: translate CI plugin configuration into one `docker run`.
//!
//! The pipeline is a single pass: snapshot the environment, assemble the
//! full argument vector (with validation along the way), run the preflight
//! steps the plan calls for (image pull, network creation), echo the
//! quoted command, and hand off to the container runtime.

pub mod assemble;
pub mod color;
pub mod config;
pub mod errors;
pub mod paths;
pub mod platform;
pub mod retry;
pub mod runtime;

pub use assemble::{assemble, EnvToken, Plan, Pull};
pub use config::{Context, Toggle, CONFIG_PREFIX};
pub use errors::{exit_code_for_error, Error, Result};
pub use paths::expand_relative_path;
pub use platform::OsFamily;
pub use retry::{retry, retry_with};
pub use runtime::{container_runtime_path, execute};

/// Join a command vector into a single shell-safe preview string.
pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_escape(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape a single shell word safely for POSIX sh.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_=/.:@".contains(c))
    {
        s.to_string()
    } else {
        let escaped = s.replace('\'', "'\"'\"'");
        format!("'{}'", escaped)
    }
}
