//! Plugin configuration access over an immutable environment snapshot.
//!
//! All configuration reaches us as environment variables: scalar options
//! under a fixed namespace prefix, and indexed families (`KEY_0`, `KEY_1`,
//! ...) for list-typed options. The snapshot keeps lookups deterministic
//! and lets tests build a [`Context`] without touching the process
//! environment.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::platform::OsFamily;

/// Namespace prefix for all plugin-declared options.
pub const CONFIG_PREFIX: &str = "BUILDKITE_PLUGIN_DOCKER_";

/// Tri-state boolean option: explicitly on, explicitly off, or left unset
/// so the OS-specific default applies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Toggle {
    Enabled,
    Disabled,
    UseDefault,
}

impl Toggle {
    /// Parse a configured value. Returns `None` for strings that are not a
    /// recognized boolean spelling.
    pub fn parse(value: &str) -> Option<Toggle> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Some(Toggle::Enabled),
            "false" | "off" | "0" => Some(Toggle::Disabled),
            _ => None,
        }
    }

    /// Collapse the tri-state into a concrete bool.
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Toggle::Enabled => true,
            Toggle::Disabled => false,
            Toggle::UseDefault => default,
        }
    }
}

/// Immutable view of one invocation: environment snapshot, absolute
/// working directory, and detected host platform.
#[derive(Clone, Debug)]
pub struct Context {
    env: BTreeMap<String, String>,
    pwd: PathBuf,
    os: OsFamily,
}

impl Context {
    /// Snapshot the ambient process environment.
    pub fn from_env() -> io::Result<Self> {
        let pwd = env::current_dir()?;
        let pwd = fs::canonicalize(&pwd).unwrap_or(pwd);
        Ok(Self {
            env: env::vars().collect(),
            pwd,
            os: OsFamily::detect(),
        })
    }

    /// Build a context from explicit variables (fixtures, tests).
    pub fn new<I, K, V>(vars: I, pwd: impl Into<PathBuf>, os: OsFamily) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            env: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            pwd: pwd.into(),
            os,
        }
    }

    pub fn pwd(&self) -> &Path {
        &self.pwd
    }

    pub fn os(&self) -> OsFamily {
        self.os
    }

    /// Raw ambient variable lookup. `Some("")` means set-but-empty, which
    /// some options (entrypoint) treat differently from unset.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// Ambient variable, treating empty values as unset.
    pub fn var_nonempty(&self, name: &str) -> Option<&str> {
        self.var(name).filter(|v| !v.is_empty())
    }

    /// Scalar plugin option (`PREFIX + key`).
    pub fn config(&self, key: &str) -> Option<&str> {
        self.var(&format!("{CONFIG_PREFIX}{key}"))
    }

    /// Scalar plugin option, treating empty values as unset.
    pub fn config_nonempty(&self, key: &str) -> Option<&str> {
        self.config(key).filter(|v| !v.is_empty())
    }

    /// Tri-state boolean option, resolved once per key. Unrecognized
    /// spellings are a configuration error rather than silently false.
    pub fn toggle(&self, key: &str) -> Result<Toggle> {
        match self.config(key) {
            None => Ok(Toggle::UseDefault),
            Some("") => Ok(Toggle::UseDefault),
            Some(v) => Toggle::parse(v).ok_or_else(|| {
                Error::Config(format!(
                    "{CONFIG_PREFIX}{key} expects a boolean (true/false), got {v:?}"
                ))
            }),
        }
    }

    /// Indexed-list primitive. For each key in order: reject when the bare
    /// key is set to a non-empty scalar (a list option was given a
    /// string), then read `KEY_0, KEY_1, ...` in increasing index order,
    /// stopping at the first absent index. Results from multiple keys are
    /// concatenated, which lets a new option name and its deprecated alias
    /// feed the same list. An empty result is a normal outcome.
    pub fn config_list(&self, keys: &[&str]) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for key in keys {
            if self.config_nonempty(key).is_some() {
                return Err(Error::Config(format!(
                    "{CONFIG_PREFIX}{key} was set as a string; this option expects a list \
                     ({CONFIG_PREFIX}{key}_0, {CONFIG_PREFIX}{key}_1, ...)"
                )));
            }
            let mut idx = 0usize;
            while let Some(v) = self.env.get(&format!("{CONFIG_PREFIX}{key}_{idx}")) {
                out.push(v.clone());
                idx += 1;
            }
        }
        Ok(out)
    }

    /// Scan the whole snapshot for `PREFIX_KEY_<n>` entries and return the
    /// values ordered by numeric index. Unlike [`Context::config_list`]
    /// this tolerates gaps in the index sequence; ordering never depends
    /// on map iteration order.
    pub fn scan_indexed(&self, key: &str) -> Vec<String> {
        let prefix = format!("{CONFIG_PREFIX}{key}_");
        let mut found: Vec<(u32, &str)> = Vec::new();
        for (name, value) in self.env.range(prefix.clone()..) {
            if !name.starts_with(&prefix) {
                break;
            }
            if let Ok(idx) = name[prefix.len()..].parse::<u32>() {
                found.push((idx, value));
            }
        }
        found.sort_by_key(|(idx, _)| *idx);
        found.into_iter().map(|(_, v)| v.to_string()).collect()
    }
}
