//! Host platform classification and OS-specific defaults.

/// Host OS family, as far as the assembled command line cares about it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Macos,
    Other,
}

impl OsFamily {
    /// Classify an `$OSTYPE`-style identifier. Case-insensitive prefix
    /// match: `win`/`msys`/`cygwin` count as Windows, `darwin` as macOS,
    /// anything else (linux-gnu, freebsd, ...) as Other.
    pub fn classify(ostype: &str) -> Self {
        let t = ostype.trim().to_ascii_lowercase();
        if t.starts_with("win") || t.starts_with("msys") || t.starts_with("cygwin") {
            OsFamily::Windows
        } else if t.starts_with("darwin") {
            OsFamily::Macos
        } else {
            OsFamily::Other
        }
    }

    /// Detect the current host family. `$OSTYPE` wins when the invoking
    /// shell exported it (git-bash and cygwin do); otherwise fall back to
    /// the compile-time target OS.
    pub fn detect() -> Self {
        if let Ok(v) = std::env::var("OSTYPE") {
            if !v.trim().is_empty() {
                return Self::classify(&v);
            }
        }
        match std::env::consts::OS {
            "windows" => OsFamily::Windows,
            "macos" => OsFamily::Macos,
            _ => OsFamily::Other,
        }
    }

    pub fn is_windows(self) -> bool {
        self == OsFamily::Windows
    }

    pub fn is_macos(self) -> bool {
        self == OsFamily::Macos
    }

    /// Default container workdir used for the checkout mount.
    pub fn default_workdir(self) -> &'static str {
        match self {
            OsFamily::Windows => "C:\\workdir",
            _ => "/workdir",
        }
    }

    /// TTY allocation defaults on, except under Windows shells where a
    /// pseudo-terminal is rarely available to the agent.
    pub fn default_tty(self) -> bool {
        !self.is_windows()
    }

    /// `--init` defaults on, except on Windows where the init shim is not
    /// shipped with the runtime.
    pub fn default_init(self) -> bool {
        !self.is_windows()
    }

    /// Agent binary auto-mounting defaults on, except on macOS where the
    /// host binary is not runnable inside a Linux container.
    pub fn default_mount_agent(self) -> bool {
        !self.is_macos()
    }

    /// Default interpreter prefix wrapped around the payload command.
    pub fn default_shell(self) -> &'static [&'static str] {
        match self {
            OsFamily::Windows => &["CMD.EXE", "/c"],
            _ => &["/bin/sh", "-e", "-c"],
        }
    }
}
