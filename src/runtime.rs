//! Container runtime discovery and plan execution.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use which::which;

use crate::assemble::Plan;
use crate::color::{color_enabled_stderr, log_info_stderr, log_warn_stderr};
use crate::errors::{Error, Result};
use crate::platform::OsFamily;
use crate::retry::retry;
use crate::shell_join;

pub fn container_runtime_path() -> io::Result<PathBuf> {
    if let Ok(p) = which("docker") {
        return Ok(p);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "docker is required but was not found in PATH.",
    ))
}

/// Pull the image up front, retrying with linear backoff. Exhausting the
/// retry budget is fatal and carries the pull's last exit status.
pub fn pull_image(runtime: &Path, image: &str, retries: u32) -> Result<()> {
    let use_err = color_enabled_stderr();
    log_info_stderr(use_err, &format!("pulling image {image}"));
    retry(retries, || {
        match Command::new(runtime).args(["pull", image]).status() {
            Ok(status) => status.code().unwrap_or(1),
            Err(_) => 1,
        }
    })
    .map_err(Error::PullFailed)
}

/// Create the requested network when it does not already exist. One
/// lookup, one conditional creation; an existing network is informational,
/// not an error.
pub fn ensure_network(runtime: &Path, name: &str) -> Result<()> {
    let use_err = color_enabled_stderr();
    let filter = format!("name=^{name}$");
    let lookup = Command::new(runtime)
        .args(["network", "ls", "--quiet", "--filter", filter.as_str()])
        .output()?;
    let existing = String::from_utf8_lossy(&lookup.stdout);
    if existing.trim().is_empty() {
        log_info_stderr(use_err, &format!("creating network {name}"));
        let status = Command::new(runtime)
            .args(["network", "create", name])
            .status()?;
        if !status.success() {
            return Err(Error::Runtime(format!("failed to create network {name}")));
        }
    } else {
        log_warn_stderr(use_err, &format!("network {name} already exists"));
    }
    Ok(())
}

/// Run the plan's preflight steps in order, echo the shell-quoted command
/// to stderr, then hand the argument vector to the container runtime with
/// inherited standard streams. Returns the runtime's exit status.
pub fn execute(plan: &Plan, os: OsFamily, dry_run: bool) -> Result<u8> {
    let runtime = container_runtime_path()?;

    if let Some(pull) = &plan.pull {
        pull_image(&runtime, &plan.image, pull.retries)?;
    }
    if let Some(net) = plan.network.as_deref() {
        ensure_network(&runtime, net)?;
    }

    let mut display = Vec::with_capacity(plan.args.len() + 1);
    display.push("docker".to_string());
    display.extend(plan.args.iter().cloned());
    eprintln!("$ {}", shell_join(&display));

    if dry_run {
        let use_err = color_enabled_stderr();
        log_info_stderr(use_err, "dry-run requested; not executing docker.");
        return Ok(0);
    }

    let mut cmd = Command::new(&runtime);
    cmd.args(&plan.args);
    if os.is_windows() {
        // git-bash rewrites container-side paths like /workdir into host
        // paths unless its conversion is switched off for this call.
        cmd.env("MSYS_NO_PATHCONV", "1");
    }
    let status = cmd.status()?;
    Ok(status.code().unwrap_or(1).clamp(0, 255) as u8)
}
