use std::process::Command;

use anyhow::{Context, Result, anyhow};
use log::trace;

/// Run a platform tool to completion, treating exit statuses listed in
/// `ok_codes` as success in addition to zero. Stderr goes into the error
/// message on failure.
pub fn run_tool(command: &mut Command, ok_codes: &[i32]) -> Result<()> {
    let program = command.get_program().to_string_lossy().to_string();
    trace!("Running {}", program);
    let output = command
        .output()
        .context(format!("Failed to run {}", program))?;
    if output.status.success() {
        return Ok(());
    }
    let code = output.status.code().unwrap_or(-1);
    if ok_codes.contains(&code) {
        return Ok(());
    }
    Err(anyhow!(
        "{} exited with status {}: {}",
        program,
        code,
        String::from_utf8_lossy(&output.stderr).trim()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_tool_success() -> Result<()> {
        run_tool(&mut Command::new("true"), &[])
    }

    #[test]
    fn test_run_tool_failure() {
        assert!(run_tool(&mut Command::new("false"), &[]).is_err());
    }

    #[test]
    fn test_run_tool_tolerated_code() -> Result<()> {
        run_tool(&mut Command::new("false"), &[1])
    }
}
