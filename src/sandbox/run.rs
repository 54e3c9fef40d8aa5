use std::collections::HashMap;
use std::ffi::OsString;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::config::{EnvVar, ShareSpec};
use crate::lock::{Lock, process_lock_name};
use crate::manifest::{ManifestStore, SandboxRecord, tmproot_to_id};
use crate::sandbox::{Sandbox, internal_flag, run_as_principal};

/// The only variables a sandboxed command may inherit from the invoking
/// environment; everything else must come in as an explicit override.
const ENV_ALLOWLIST: &[&str] = &[
    "ALLUSERSPROFILE",
    "APPDATA",
    "COMMONPROGRAMFILES",
    "COMMONPROGRAMW6432",
    "COMPUTERNAME",
    "COMSPEC",
    "DRIVERDATA",
    "HOME",
    "HOMEDRIVE",
    "HOMEPATH",
    "LOCALAPPDATA",
    "NUMBER_OF_PROCESSORS",
    "OS",
    "PATH",
    "PATHEXT",
    "PROCESSOR_ARCHITECTURE",
    "PROCESSOR_IDENTIFIER",
    "PROCESSOR_LEVEL",
    "PROCESSOR_REVISION",
    "PROGRAMDATA",
    "PROGRAMFILES",
    "PROGRAMFILES(X86)",
    "PROGRAMW6432",
    "PROMPT",
    "PSMODULEPATH",
    "PUBLIC",
    "SHELL",
    "SYSTEMDRIVE",
    "SYSTEMROOT",
    "TEMP",
    "TMP",
    "USERDOMAIN",
    "USERPROFILE",
    "WINDIR",
];

pub struct RunRequest {
    pub command: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<EnvVar>,
    pub volumes: Vec<ShareSpec>,
    pub root: Option<PathBuf>,
    pub keep: bool,
    pub log_level: Option<log::LevelFilter>,
}

pub enum RunOutcome {
    /// The sandboxed command finished with this exit code.
    Exited(i32),
    /// No command was given: a sandbox was stood up at this root.
    Detached(PathBuf),
}

/// The serialized `{user, password}` descriptor the internal marker
/// variable carries across the re-exec boundary, letting the continuation
/// skip the manifest entirely.
#[derive(Serialize, Deserialize)]
struct Continuation {
    user: String,
    password: Option<String>,
}

impl Sandbox {
    /// Rebuild a sandbox handle from the marker descriptor of a re-exec'd
    /// continuation.
    pub fn from_continuation(
        id: &str,
        tmproot: &Path,
        descriptor: &str,
    ) -> Result<Sandbox> {
        let continuation: Continuation = serde_json::from_str(descriptor)
            .context(format!(
                "Invalid continuation descriptor for sandbox {}",
                id
            ))?;
        Ok(Sandbox::from_record(
            id.to_string(),
            SandboxRecord {
                tmproot: tmproot.to_path_buf(),
                user: Some(continuation.user),
                password: continuation.password,
                ..Default::default()
            },
        ))
    }
}

/// Top-level entry point: obtain or attach to a sandbox, execute the
/// command under its principal, and tear everything down afterward unless
/// asked to keep it.
pub fn run(store: &ManifestStore, request: &RunRequest) -> Result<RunOutcome> {
    // Holding this lock for the rest of our lifetime is what marks the
    // sandbox as in use; the OS drops it when we die, crash included, which
    // hands the sandbox to the next reclamation pass.
    let pending = if request.keep {
        None
    } else {
        Some(Lock::acquire(&process_lock_name())?)
    };
    let pending_name = pending.as_ref().map(Lock::name);

    let sandbox = match &request.root {
        None => Sandbox::create(store, &request.volumes, pending_name)?,
        Some(root) => {
            let id = tmproot_to_id(root)?;
            match std::env::var(internal_flag(&id)) {
                Ok(descriptor) => {
                    Sandbox::from_continuation(&id, root, &descriptor)?
                }
                Err(_) => Sandbox::get(store, &id, pending_name)?,
            }
        }
    };

    if request.command.is_empty() {
        return Ok(RunOutcome::Detached(sandbox.record.tmproot.clone()));
    }

    let status = execute(&sandbox, request)?;
    if !request.keep {
        sandbox.remove(store)?;
    }
    Ok(RunOutcome::Exited(exit_code(status)))
}

/// Inner invocations (internal marker present) elevate directly and never
/// return. Outer invocations re-exec this binary with the marker set so
/// that the target command ultimately runs one exec away from the
/// principal instead of under a chain of elevation wrappers.
fn execute(sandbox: &Sandbox, request: &RunRequest) -> Result<ExitStatus> {
    let flag = internal_flag(&sandbox.id);
    let env = restricted_env(&request.env);

    if std::env::var_os(&flag).is_some() {
        let status = run_as_principal(
            sandbox,
            &request.command,
            request.cwd.as_deref(),
            &env,
        )?;
        trace!("Sandboxed command finished: {}", status);
        std::process::exit(exit_code(status));
    }

    let exe = std::env::current_exe()
        .context("Failed to resolve our own executable for re-exec")?;
    let descriptor = serde_json::to_string(&Continuation {
        user: sandbox.user()?.to_string(),
        password: sandbox.record.password.clone(),
    })
    .context("Failed to serialize continuation descriptor")?;

    debug!("Re-executing as a continuation for sandbox {}", sandbox.id);
    let mut continuation = Command::new(exe);
    continuation.args(continuation_args(request, &sandbox.record.tmproot));
    continuation.env_clear().envs(&env).env(&flag, descriptor);
    if let Some(cwd) = &request.cwd {
        continuation.current_dir(cwd);
    }
    continuation
        .status()
        .context("Failed to re-execute for privilege drop")
}

/// Arguments for the re-exec'd continuation. The requested verbosity is
/// forwarded so inner-stage logging is not lost.
fn continuation_args(request: &RunRequest, tmproot: &Path) -> Vec<OsString> {
    let mut args =
        vec![OsString::from("--root"), tmproot.as_os_str().to_os_string()];
    if let Some(level) = request.log_level {
        args.push(OsString::from("--log-level"));
        args.push(OsString::from(level.to_string()));
    }
    for var in &request.env {
        args.push(OsString::from("--env"));
        args.push(OsString::from(format!("{}={}", var.key, var.value)));
    }
    args.push(OsString::from("--"));
    args.extend(request.command.iter().map(OsString::from));
    args
}

/// Build the sandboxed command's environment: the inherited allowlist plus
/// caller overrides. The parent environment is never passed through
/// wholesale.
pub fn restricted_env(overrides: &[EnvVar]) -> HashMap<String, String> {
    let mut env = HashMap::new();
    for (key, value) in std::env::vars() {
        let upper = key.to_uppercase();
        if ENV_ALLOWLIST.contains(&upper.as_str()) {
            env.insert(key, value);
        }
    }
    for var in overrides {
        env.insert(var.key.clone(), var.value.clone());
    }
    env
}

/// Map an exit status to the code we propagate: the command's own code, or
/// the conventional 128+signal when it died to one.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restricted_env_filters_inherited_variables() {
        // PATH is allowlisted in every environment this test runs in
        unsafe {
            std::env::set_var("UBOX_TEST_SECRET", "do-not-leak");
        }
        let env = restricted_env(&[]);
        assert!(env.contains_key("PATH"));
        assert!(!env.contains_key("UBOX_TEST_SECRET"));
    }

    #[test]
    fn test_restricted_env_applies_overrides() {
        let overrides = vec![
            EnvVar {
                key: "CUSTOM".to_string(),
                value: "yes".to_string(),
            },
            EnvVar {
                key: "PATH".to_string(),
                value: "/overridden".to_string(),
            },
        ];
        let env = restricted_env(&overrides);
        assert_eq!(env.get("CUSTOM").map(String::as_str), Some("yes"));
        assert_eq!(env.get("PATH").map(String::as_str), Some("/overridden"));
    }

    #[test]
    fn test_exit_code_plain_exit() {
        let status = Command::new("false")
            .status()
            .expect("failed to run false");
        assert_eq!(exit_code(status), 1);
    }

    fn request(command: &[&str]) -> RunRequest {
        RunRequest {
            command: command.iter().map(|s| s.to_string()).collect(),
            cwd: None,
            env: Vec::new(),
            volumes: Vec::new(),
            root: None,
            keep: false,
            log_level: None,
        }
    }

    #[test]
    fn test_continuation_args_forward_log_level() {
        let mut request = request(&["true"]);
        request.log_level = Some(log::LevelFilter::Debug);
        let args =
            continuation_args(&request, Path::new("/tmp/ubox_tmp_abc"));
        let position = args
            .iter()
            .position(|a| a == "--log-level")
            .expect("verbosity must be forwarded to the continuation");
        assert_eq!(args[position + 1], OsString::from("DEBUG"));
    }

    #[test]
    fn test_continuation_args_without_log_level() {
        let mut request = request(&["echo", "hi"]);
        request.env.push(EnvVar {
            key: "FOO".to_string(),
            value: "bar".to_string(),
        });
        let args =
            continuation_args(&request, Path::new("/tmp/ubox_tmp_abc"));
        assert!(!args.contains(&OsString::from("--log-level")));
        assert_eq!(
            args,
            vec![
                OsString::from("--root"),
                OsString::from("/tmp/ubox_tmp_abc"),
                OsString::from("--env"),
                OsString::from("FOO=bar"),
                OsString::from("--"),
                OsString::from("echo"),
                OsString::from("hi"),
            ]
        );
    }

    #[test]
    fn test_continuation_descriptor_round_trip() -> Result<()> {
        let descriptor = serde_json::to_string(&Continuation {
            user: "uboxabc123def456".to_string(),
            password: None,
        })?;
        let sandbox = Sandbox::from_continuation(
            "abc123def456",
            Path::new("/tmp/ubox_tmp_abc123def456"),
            &descriptor,
        )?;
        assert_eq!(sandbox.user()?, "uboxabc123def456");
        assert!(sandbox.record.password.is_none());
        assert!(sandbox.record.pending_deletion_lock.is_none());
        Ok(())
    }
}
