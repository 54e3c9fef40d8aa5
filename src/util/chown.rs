use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use log::trace;
use nix::unistd::{User, chown};

use crate::util::{run_tool, which};

/// Hand ownership of a path to the named account. Accounts provisioned
/// outside the passwd database (net user) have no uid to chown to, so those
/// fall back to an icacls ownership edit.
pub fn chown_to(path: &Path, user: &str) -> Result<()> {
    match User::from_name(user)
        .context(format!("Failed to look up account {}", user))?
    {
        Some(account) => {
            trace!("chown {} to {}", path.display(), user);
            chown(path, Some(account.uid), None).context(format!(
                "Failed to chown {} to {}",
                path.display(),
                user
            ))?;
            Ok(())
        }
        None => {
            let Some(icacls) = which("icacls") else {
                return Err(anyhow!(
                    "No passwd entry for {} and no icacls to set ownership of {}",
                    user,
                    path.display()
                ));
            };
            run_tool(
                Command::new(&icacls)
                    .arg(path)
                    .arg("/setowner")
                    .arg(user)
                    .arg("/t"),
                &[],
            )?;
            run_tool(
                Command::new(&icacls)
                    .arg(path)
                    .arg("/grant")
                    .arg(format!("{}:F", user))
                    .arg("/t"),
                &[],
            )
        }
    }
}
