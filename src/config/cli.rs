use std::path::PathBuf;

use clap::Parser;

use crate::config::{EnvVar, ShareSpec};

#[derive(Parser, Clone, Debug)]
#[command(version, about = "Run a command as a freshly provisioned, disposable, low-privilege user", long_about = None,
    override_usage = "ubox [OPTIONS] [--] [COMMAND...]")]
pub struct Args {
    /// Set the log level to one of trace, debug, info, warn, or error.
    #[arg(long, value_parser = parse_log_level)]
    pub log_level: Option<log::LevelFilter>,

    /// Keep the sandbox (directory, user, and grants) after exiting
    #[arg(short = 'k', long)]
    pub keep: bool,

    /// Use the sandbox with the given root instead of creating a new one
    #[arg(short = 'r', long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Share a host path with the sandbox. Format: SRC[:DST][:ro].
    /// Repeatable.
    #[arg(short = 'v', long, action = clap::ArgAction::Append)]
    pub volume: Vec<ShareSpec>,

    /// Set an environment variable for the sandboxed command. Repeatable.
    #[arg(short = 'e', long, action = clap::ArgAction::Append)]
    pub env: Vec<EnvVar>,

    /// Working directory for the sandboxed command
    #[arg(short = 'w', long, value_hint = clap::ValueHint::DirPath)]
    pub cwd: Option<PathBuf>,

    /// The command to run in the sandbox and its arguments. With no
    /// command, a sandbox is stood up and its root printed.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 0..,
        help_heading = "Sandboxed Command"
    )]
    pub command: Vec<String>,
}

fn parse_log_level(s: &str) -> Result<log::LevelFilter, String> {
    s.parse::<log::LevelFilter>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_invocation() {
        let args =
            Args::parse_from(["ubox", "-v", "/data:ro", "--", "echo", "hi"]);
        assert!(!args.keep);
        assert_eq!(args.volume.len(), 1);
        assert!(args.volume[0].read_only);
        assert_eq!(args.command, vec!["echo", "hi"]);
    }

    #[test]
    fn test_parse_empty_command() {
        let args = Args::parse_from(["ubox", "--keep"]);
        assert!(args.keep);
        assert!(args.command.is_empty());
    }

    #[test]
    fn test_parse_hyphen_values_in_command() {
        let args = Args::parse_from(["ubox", "--", "ls", "-la", "/tmp"]);
        assert_eq!(args.command, vec!["ls", "-la", "/tmp"]);
    }

    #[test]
    fn test_parse_env_and_cwd() {
        let args = Args::parse_from([
            "ubox", "-e", "FOO=bar", "-e", "BAZ=", "-w", "/work", "--",
            "env",
        ]);
        assert_eq!(args.env.len(), 2);
        assert_eq!(args.env[0].key, "FOO");
        assert_eq!(args.cwd, Some(PathBuf::from("/work")));
    }

    #[test]
    fn test_parse_rejects_bad_volume() {
        assert!(
            Args::try_parse_from(["ubox", "-v", ":broken", "--", "true"])
                .is_err()
        );
    }
}
