//! Volume path normalization.

use std::path::Path;

/// Expand a leading relative-current-directory marker into the invocation's
/// absolute working directory. Handles both plain paths (`./cache`) and
/// `source:destination` mount specs whose source is the marker itself
/// (`.:/app`). Docker performs no such expansion on `--volume` sources, so
/// it has to happen here. Anything that does not start with the marker
/// passes through unchanged, which also makes the function idempotent on
/// its own output.
pub fn expand_relative_path(spec: &str, pwd: &Path) -> String {
    let pwd = pwd.display();
    if let Some(rest) = spec.strip_prefix("./") {
        format!("{pwd}/{rest}")
    } else if let Some(rest) = spec.strip_prefix(".\\") {
        format!("{pwd}\\{rest}")
    } else if let Some(rest) = spec.strip_prefix(".:") {
        format!("{pwd}:{rest}")
    } else {
        spec.to_string()
    }
}
