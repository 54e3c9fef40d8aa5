use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result, anyhow};
use log::debug;

use crate::sandbox::Sandbox;
use crate::util::{generate_id, which};

/// One privilege-drop strategy: a way to launch the target command directly
/// as the sandbox principal. Same dispatch discipline as the other
/// capability queues; the credential-based PowerShell launch is last because
/// it is the only one that needs a plaintext password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevateTool {
    Sudo,
    Doas,
    Runuser,
    Powershell,
}

const QUEUE: [ElevateTool; 4] = [
    ElevateTool::Sudo,
    ElevateTool::Doas,
    ElevateTool::Runuser,
    ElevateTool::Powershell,
];

/// Run a command as the sandbox principal through the first applicable
/// strategy, with the given (already restricted) environment.
pub fn run_as_principal(
    sandbox: &Sandbox,
    command: &[String],
    cwd: Option<&Path>,
    env: &HashMap<String, String>,
) -> Result<ExitStatus> {
    let (program, args) = command
        .split_first()
        .context("No command to run in the sandbox")?;
    for tool in QUEUE {
        if let Some(status) = tool.try_run(sandbox, program, args, cwd, env)? {
            return Ok(status);
        }
    }
    Err(anyhow!(
        "Unable to run a command as {}: no privilege-drop tool available",
        sandbox.user()?
    ))
}

impl ElevateTool {
    fn try_run(
        self,
        sandbox: &Sandbox,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<Option<ExitStatus>> {
        match self {
            ElevateTool::Sudo => {
                try_run_as(sandbox, "sudo", program, args, cwd, env)
            }
            ElevateTool::Doas => {
                try_run_as(sandbox, "doas", program, args, cwd, env)
            }
            ElevateTool::Runuser => {
                try_runuser(sandbox, program, args, cwd, env)
            }
            ElevateTool::Powershell => {
                try_powershell(sandbox, program, args, cwd, env)
            }
        }
    }
}

fn wait_for(mut launcher: Command, tool: &str) -> Result<ExitStatus> {
    launcher
        .status()
        .context(format!("Failed to launch command via {}", tool))
}

/// sudo and doas share an argument shape: `-u USER COMMAND...`.
fn try_run_as(
    sandbox: &Sandbox,
    tool: &str,
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    env: &HashMap<String, String>,
) -> Result<Option<ExitStatus>> {
    let Some(path) = which(tool) else {
        return Ok(None);
    };
    debug!("Running command as {} via {}", sandbox.user()?, tool);
    let mut launcher = Command::new(path);
    launcher.arg("-u").arg(sandbox.user()?).arg(program).args(args);
    launcher.env_clear().envs(env);
    if let Some(cwd) = cwd {
        launcher.current_dir(cwd);
    }
    Ok(Some(wait_for(launcher, tool)?))
}

fn try_runuser(
    sandbox: &Sandbox,
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    env: &HashMap<String, String>,
) -> Result<Option<ExitStatus>> {
    let Some(runuser) = which("runuser") else {
        return Ok(None);
    };
    debug!("Running command as {} via runuser", sandbox.user()?);
    let mut launcher = Command::new(runuser);
    launcher
        .arg("-u")
        .arg(sandbox.user()?)
        .arg("--")
        .arg(program)
        .args(args);
    launcher.env_clear().envs(env);
    if let Some(cwd) = cwd {
        launcher.current_dir(cwd);
    }
    Ok(Some(wait_for(launcher, "runuser")?))
}

/// Credential-based launch for platforms without an in-kernel identity
/// switch. The password travels through a one-shot nonce environment
/// variable that the script consumes and clears, never through argv.
fn try_powershell(
    sandbox: &Sandbox,
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    env: &HashMap<String, String>,
) -> Result<Option<ExitStatus>> {
    let Some(powershell) = which("powershell") else {
        return Ok(None);
    };
    let password = sandbox.record.password.clone().context(format!(
        "Credential-based launch for {} requires a password",
        sandbox.user()?
    ))?;
    let nonce = format!("Z{}", generate_id());
    let mut script = format!(
        "$s=ConvertTo-SecureString -String $env:{} -AsPlainText -Force;",
        nonce
    );
    script.push_str(&format!("$env:{}=0;", nonce));
    script.push_str(&format!(
        "$c=New-Object -Type PSCredential(\"{}\",$s);",
        sandbox.user()?
    ));
    script.push_str(&format!(
        "exit (Start-Process -Credential $c -FilePath '{}'",
        ps_quote(program)
    ));
    if !args.is_empty() {
        script.push_str(&format!(
            " -ArgumentList '{}'",
            ps_quote(&args.join(" "))
        ));
    }
    script.push_str(" -NoNewWindow -PassThru -Wait).ExitCode");

    debug!("Running command as {} via powershell", sandbox.user()?);
    let mut launcher = Command::new(powershell);
    launcher.arg("-c").arg(script);
    launcher.env_clear().envs(env).env(&nonce, password);
    launcher.current_dir(cwd.unwrap_or(&sandbox.record.tmproot));
    Ok(Some(wait_for(launcher, "powershell")?))
}

fn ps_quote(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::SandboxRecord;
    use std::path::PathBuf;

    #[test]
    fn test_ps_quote_doubles_single_quotes() {
        assert_eq!(ps_quote("it's"), "it''s");
        assert_eq!(ps_quote("plain"), "plain");
    }

    #[test]
    fn test_run_as_principal_requires_a_command() {
        let sandbox = Sandbox::from_record(
            "abc123def456".to_string(),
            SandboxRecord {
                tmproot: PathBuf::from("/tmp/ubox_tmp_abc123def456"),
                user: Some("uboxabc123def456".to_string()),
                ..Default::default()
            },
        );
        let res = run_as_principal(&sandbox, &[], None, &HashMap::new());
        assert!(res.is_err());
    }
}
