//! Error types and exit-code mapping.
//!
//! Two error classes: fatal configuration problems (nothing external has
//! run yet) and runtime failures from the docker invocations themselves.
//! Exit codes follow the usual shell conventions: 127 for a missing
//! binary, the pull's own status when the retry budget is exhausted,
//! 1 for everything else.

use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Invalid or conflicting plugin configuration.
    Config(String),
    Io(io::Error),
    /// A docker preflight command failed (e.g. network creation).
    Runtime(String),
    /// Image pull still failing after the configured retries; carries the
    /// last exit status.
    PullFailed(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "{msg}"),
            Error::Io(e) => write!(f, "{e}"),
            Error::Runtime(msg) => write!(f, "{msg}"),
            Error::PullFailed(status) => {
                write!(f, "image pull failed with exit status {status} after exhausting retries")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Map an error to the process exit code:
/// - 127 for a missing executable (command not found)
/// - the pull's own exit status when pulling gave up
/// - 1 for everything else
pub fn exit_code_for_error(e: &Error) -> u8 {
    match e {
        Error::Config(_) | Error::Runtime(_) => 1,
        Error::Io(ioe) => {
            if ioe.kind() == io::ErrorKind::NotFound {
                127
            } else {
                1
            }
        }
        Error::PullFailed(status) => u8::try_from(*status).unwrap_or(1).max(1),
    }
}
