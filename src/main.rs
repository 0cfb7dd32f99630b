use std::process::ExitCode;

use clap::Parser;
use docker_step::color::{color_enabled_stderr, log_error_stderr, set_color_mode, ColorMode};
use docker_step::{assemble, execute, exit_code_for_error, Context};

#[derive(Parser, Debug)]
#[command(
    name = "docker-step",
    version,
    about = "Run a CI step command inside a Docker container, configured from plugin environment variables."
)]
struct Cli {
    /// Prepare and print what would run, but do not execute
    #[arg(long)]
    dry_run: bool,

    /// Print detailed execution info
    #[arg(long)]
    verbose: bool,

    /// Colorize output: auto|always|never
    #[arg(long, value_enum)]
    color: Option<ColorMode>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        set_color_mode(mode);
    }
    let use_err = color_enabled_stderr();

    let ctx = match Context::from_env() {
        Ok(c) => c,
        Err(e) => {
            log_error_stderr(use_err, &format!("docker-step: {e}"));
            return ExitCode::from(1);
        }
    };

    let plan = match assemble(&ctx) {
        Ok(p) => p,
        Err(e) => {
            log_error_stderr(use_err, &format!("docker-step: {e}"));
            return ExitCode::from(exit_code_for_error(&e));
        }
    };

    if cli.verbose {
        eprintln!("docker-step: image: {}", plan.image);
        eprintln!("docker-step: platform: {:?}", ctx.os());
        eprintln!("docker-step: workdir: {}", ctx.pwd().display());
    }

    match execute(&plan, ctx.os(), cli.dry_run) {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            log_error_stderr(use_err, &format!("docker-step: {e}"));
            ExitCode::from(exit_code_for_error(&e))
        }
    }
}
