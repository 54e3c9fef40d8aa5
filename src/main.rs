#![deny(
    clippy::get_unwrap,
    clippy::panic,
    clippy::print_stdout,
    clippy::unwrap_used,
    clippy::use_debug
)]

use anyhow::{Result, anyhow};
use clap::Parser;
use nix::unistd::geteuid;

use ubox::config::cli;
use ubox::logger;
use ubox::manifest::ManifestStore;
use ubox::sandbox::{RunOutcome, RunRequest, run};

/// Exit code for provisioning and teardown failures, distinct from any exit
/// code the sandboxed command itself produces.
const EXIT_OPERATION_FAILED: i32 = 125;

pub fn main() {
    let code = match run_cli() {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            EXIT_OPERATION_FAILED
        }
    };
    log::logger().flush();
    std::process::exit(code);
}

#[allow(clippy::print_stdout)]
fn run_cli() -> Result<i32> {
    let logger = logger::UboxLogger::new(log::LevelFilter::Info)
        .init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;
    let cli = cli::Args::parse();

    if let Some(log_level) = cli.log_level {
        logger.set_level(log_level);
    }

    // Account provisioning and ACL edits need root
    if !geteuid().is_root() {
        return Err(anyhow!(
            "Insufficient permissions to provision sandbox accounts, please retry using `sudo`"
        ));
    }

    let store = ManifestStore::default_location()?;
    let request = RunRequest {
        command: cli.command,
        cwd: cli.cwd,
        env: cli.env,
        volumes: cli.volume,
        root: cli.root,
        keep: cli.keep,
        log_level: cli.log_level,
    };

    match run(&store, &request)? {
        RunOutcome::Exited(code) => Ok(code),
        RunOutcome::Detached(root) => {
            println!("{}", root.display());
            Ok(0)
        }
    }
}
