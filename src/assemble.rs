//! `docker run` argument assembly.
//!
//! One deterministic pass over the configuration, appending tokens to the
//! argument vector in a fixed order. Order matters to docker only where
//! its grammar says so (flags before the image, image before the shell
//! and payload), but keeping every decision in a fixed sequence makes the
//! assembled command reproducible for a given configuration.

use std::fs;
use std::path::PathBuf;

#[cfg(unix)]
use nix::unistd::{getgid, getuid};

use crate::color::warn_print;
use crate::config::{Context, CONFIG_PREFIX};
use crate::errors::{Error, Result};
use crate::paths::expand_relative_path;

/// Environment flag payload. Passthrough carries only the variable name;
/// the runtime resolves the value from its own environment at launch, so
/// secrets never appear in the echoed command line. Literal carries an
/// explicit value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvToken {
    Passthrough(String),
    Literal(String, String),
}

impl EnvToken {
    pub fn render(&self) -> String {
        match self {
            EnvToken::Passthrough(name) => name.clone(),
            EnvToken::Literal(name, value) => format!("{name}={value}"),
        }
    }
}

/// Preflight image pull request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pull {
    pub retries: u32,
}

/// Everything needed to run the step: preflight side effects plus the full
/// `docker` argument vector (starting with `run`).
#[derive(Clone, Debug)]
pub struct Plan {
    pub image: String,
    pub pull: Option<Pull>,
    pub network: Option<String>,
    pub args: Vec<String>,
}

/// Shell configuration states: disabled outright, waiting for the
/// platform default, or an explicit interpreter token list.
enum ShellState {
    Disabled,
    DefaultPending,
    Explicit(Vec<String>),
}

fn push(args: &mut Vec<String>, arg: impl Into<String>) {
    args.push(arg.into());
}

fn push_env(args: &mut Vec<String>, token: &EnvToken) {
    push(args, "--env");
    push(args, token.render());
}

/// Assemble the complete run plan from one configuration snapshot.
///
/// Fatal validation (conflicting options, type mismatches, legacy forms)
/// happens here, before any external process runs. The only side effects
/// are read-only probes: a PATH search for the agent binary, a stat of the
/// SSH agent socket, and reading the prepared environment file.
pub fn assemble(ctx: &Context) -> Result<Plan> {
    let os = ctx.os();
    let mut args: Vec<String> = vec!["run".to_string()];

    let image = ctx
        .config_nonempty("IMAGE")
        .ok_or_else(|| Error::Config("the image option is required but was not set".into()))?
        .to_string();

    // The step-level command string and the command list are mutually
    // exclusive; reject before assembling anything around them.
    let supplied_command = ctx.var_nonempty("BUILDKITE_COMMAND").map(str::to_string);
    let command_list = ctx.config_list(&["COMMAND"])?;
    if supplied_command.is_some() && !command_list.is_empty() {
        return Err(Error::Config(
            "a step command and the command option were both supplied; configure only one".into(),
        ));
    }

    if ctx.toggle("TTY")?.resolve(os.default_tty()) {
        push(&mut args, "-it");
    } else {
        push(&mut args, "-i");
    }
    push(&mut args, "--rm");

    if ctx.toggle("INIT")?.resolve(os.default_init()) {
        push(&mut args, "--init");
    }

    for spec in ctx.config_list(&["TMPFS"])? {
        push(&mut args, "--tmpfs");
        push(&mut args, expand_relative_path(&spec, ctx.pwd()));
    }

    let mount_checkout = ctx.toggle("MOUNT_CHECKOUT")?.resolve(true);
    let workdir: Option<String> = match ctx.config_nonempty("WORKDIR") {
        Some(w) => Some(w.to_string()),
        None if mount_checkout => Some(os.default_workdir().to_string()),
        None => None,
    };

    if mount_checkout {
        if let Some(wd) = workdir.as_deref() {
            push(&mut args, "--volume");
            push(&mut args, format!("{}:{}", ctx.pwd().display(), wd));
        }
    }

    for spec in ctx.config_list(&["VOLUMES", "MOUNTS"])? {
        push(&mut args, "--volume");
        push(&mut args, expand_relative_path(&spec, ctx.pwd()));
    }

    for device in ctx.config_list(&["DEVICES"])? {
        push(&mut args, "--device");
        push(&mut args, device);
    }

    for sysctl in ctx.config_list(&["SYSCTLS"])? {
        push(&mut args, "--sysctl");
        push(&mut args, sysctl);
    }

    if let Some(wd) = workdir.as_deref() {
        push(&mut args, "--workdir");
        push(&mut args, wd);
    }

    let user = ctx.config_nonempty("USER");
    let propagate_ids = ctx.toggle("PROPAGATE_UID_GID")?.resolve(false);
    if user.is_some() && propagate_ids {
        return Err(Error::Config(
            "the user option and propagate-uid-gid are mutually exclusive; set only one".into(),
        ));
    }
    if let Some(u) = user {
        push(&mut args, "-u");
        push(&mut args, u);
    } else if propagate_ids {
        #[cfg(not(unix))]
        return Err(Error::Config(
            "propagate-uid-gid is only supported on unix hosts".into(),
        ));
        #[cfg(unix)]
        {
            push(&mut args, "-u");
            push(
                &mut args,
                format!("{}:{}", u32::from(getuid()), u32::from(getgid())),
            );
        }
    }

    for port in ctx.config_list(&["PUBLISH"])? {
        push(&mut args, "--publish");
        push(&mut args, port);
    }

    for group in ctx.scan_indexed("ADDITIONAL_GROUPS") {
        push(&mut args, "--group-add");
        push(&mut args, group);
    }

    let privileged = ctx.toggle("PRIVILEGED")?.resolve(false);
    if let Some(ns) = ctx.config_nonempty("USERNS") {
        // A privileged container cannot join a user namespace other than
        // the host's.
        let effective = if privileged { "host" } else { ns };
        push(&mut args, "--userns");
        push(&mut args, effective);
    }

    if ctx.toggle("MOUNT_SSH_AGENT")?.resolve(false) {
        #[cfg(not(unix))]
        return Err(Error::Config(
            "mount-ssh-agent is only supported on unix hosts".into(),
        ));
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            let sock = ctx.var_nonempty("SSH_AUTH_SOCK").ok_or_else(|| {
                Error::Config(
                    "mount-ssh-agent was requested but SSH_AUTH_SOCK is not set; \
                     has ssh-agent been started?"
                        .into(),
                )
            })?;
            let meta = fs::metadata(sock).map_err(|_| {
                Error::Config(format!(
                    "SSH_AUTH_SOCK points at {sock}, but nothing exists there; \
                     has ssh-agent been started?"
                ))
            })?;
            if !meta.file_type().is_socket() {
                return Err(Error::Config(format!(
                    "SSH_AUTH_SOCK points at {sock}, which is not a socket"
                )));
            }
            push_env(
                &mut args,
                &EnvToken::Literal("SSH_AUTH_SOCK".into(), "/ssh-agent".into()),
            );
            push(&mut args, "--volume");
            push(&mut args, format!("{sock}:/ssh-agent"));
            match home::home_dir() {
                Some(host_home) => {
                    push(&mut args, "--volume");
                    push(
                        &mut args,
                        format!(
                            "{}:/root/.ssh/known_hosts",
                            host_home.join(".ssh").join("known_hosts").display()
                        ),
                    );
                }
                None => warn_print(
                    "could not determine the host home directory; not mounting known_hosts",
                ),
            }
        }
    }

    if ctx.toggle("MOUNT_BUILDKITE_AGENT")?.resolve(os.default_mount_agent()) {
        let binary: Option<PathBuf> = match ctx.var_nonempty("BUILDKITE_AGENT_BINARY_PATH") {
            Some(p) => Some(PathBuf::from(p)),
            None => which::which("buildkite-agent").ok(),
        };
        match binary {
            Some(bin) => {
                for name in [
                    "BUILDKITE_JOB_ID",
                    "BUILDKITE_BUILD_ID",
                    "BUILDKITE_AGENT_ACCESS_TOKEN",
                ] {
                    push_env(&mut args, &EnvToken::Passthrough(name.to_string()));
                }
                push(&mut args, "--volume");
                push(&mut args, format!("{}:/usr/bin/buildkite-agent", bin.display()));
            }
            None => warn_print(
                "buildkite-agent was not found in PATH; not mounting the agent binary",
            ),
        }
    }

    for entry in ctx.scan_indexed("ENVIRONMENT") {
        let token = match entry.split_once('=') {
            Some((name, value)) => EnvToken::Literal(name.to_string(), value.to_string()),
            None => EnvToken::Passthrough(entry),
        };
        push_env(&mut args, &token);
    }

    for host in ctx.scan_indexed("ADD_HOST") {
        push(&mut args, "--add-host");
        push(&mut args, host);
    }

    if privileged {
        push(&mut args, "--privileged");
    }

    if ctx.toggle("PROPAGATE_ENVIRONMENT")?.resolve(false) {
        match ctx.var_nonempty("BUILDKITE_ENV_FILE") {
            Some(path) => match fs::read_to_string(path) {
                Ok(contents) => {
                    for line in contents.lines() {
                        let name = line.split('=').next().unwrap_or("").trim();
                        if !name.is_empty() {
                            push_env(&mut args, &EnvToken::Passthrough(name.to_string()));
                        }
                    }
                }
                Err(e) => warn_print(&format!(
                    "could not read the environment file {path} ({e}); \
                     not propagating the build environment"
                )),
            },
            None => warn_print(
                "BUILDKITE_ENV_FILE is not set; unable to propagate the build environment",
            ),
        }
    }

    let pull = if ctx.toggle("ALWAYS_PULL")?.resolve(false) {
        let retries = match ctx.config_nonempty("PULL_RETRIES") {
            Some(v) => v.trim().parse::<u32>().map_err(|_| {
                Error::Config(format!("pull-retries expects a number, got {v:?}"))
            })?,
            None => 3,
        };
        Some(Pull { retries })
    } else {
        None
    };

    let network = ctx.config_nonempty("NETWORK").map(str::to_string);
    if let Some(net) = network.as_deref() {
        push(&mut args, "--network");
        push(&mut args, net);
    }

    if let Some(v) = ctx.config_nonempty("RUNTIME") {
        push(&mut args, "--runtime");
        push(&mut args, v);
    }
    if let Some(v) = ctx.config_nonempty("IPC") {
        push(&mut args, "--ipc");
        push(&mut args, v);
    }
    if let Some(v) = ctx.config_nonempty("SHM_SIZE") {
        push(&mut args, "--shm-size");
        push(&mut args, v);
    }
    if let Some(v) = ctx.config_nonempty("CPUS") {
        push(&mut args, format!("--cpus={v}"));
    }

    let mut shell = ShellState::DefaultPending;
    if let Some(entrypoint) = ctx.config("ENTRYPOINT") {
        // An empty string is a valid override that clears the image's
        // entrypoint, so presence is what counts here.
        push(&mut args, "--entrypoint");
        push(&mut args, entrypoint);
        shell = ShellState::Disabled;
    }

    match ctx.config("SHELL") {
        Some(v) if !v.is_empty() => {
            if matches!(v, "false" | "off" | "0") {
                shell = ShellState::Disabled;
            } else {
                return Err(Error::Config(format!(
                    "the shell option expects a list of tokens \
                     ({CONFIG_PREFIX}SHELL_0, {CONFIG_PREFIX}SHELL_1, ...), not the string {v:?}"
                )));
            }
        }
        _ => {
            let tokens = ctx.config_list(&["SHELL"])?;
            if !tokens.is_empty() {
                shell = ShellState::Explicit(tokens);
            }
        }
    }

    push(&mut args, "--label");
    push(
        &mut args,
        format!(
            "com.buildkite.job-id={}",
            ctx.var("BUILDKITE_JOB_ID").unwrap_or("")
        ),
    );

    push(&mut args, image.clone());

    match shell {
        ShellState::Disabled => {}
        ShellState::Explicit(tokens) => args.extend(tokens),
        ShellState::DefaultPending => {
            args.extend(os.default_shell().iter().map(|t| t.to_string()));
        }
    }

    if let Some(command) = supplied_command {
        if os.is_windows() {
            // CMD.EXE has no multi-line scripts; join the lines with an
            // explicit command separator.
            let joined = command
                .lines()
                .filter(|l| !l.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" && ");
            push(&mut args, joined);
        } else {
            push(&mut args, command);
        }
    } else {
        args.extend(command_list);
    }

    Ok(Plan {
        image,
        pull,
        network,
        args,
    })
}
