use std::path::Path;
use std::process::Command;

use anyhow::{Result, anyhow};
use log::{debug, trace};

use crate::acl::AclTool;
use crate::util::which;

/// Revoke a previously granted ACL entry. Failures of the underlying tool
/// are logged and swallowed: the entry may be partially gone already, and a
/// revoke must never block the rest of a teardown.
pub fn revoke_access(user: &str, path: &Path) -> Result<()> {
    for tool in AclTool::queue() {
        if tool.try_revoke(user, path).is_some() {
            debug!("Revoked {} access to {}", user, path.display());
            return Ok(());
        }
    }
    Err(anyhow!(
        "Unable to revoke {} access to {}: no ACL tool available",
        user,
        path.display()
    ))
}

impl AclTool {
    fn try_revoke(self, user: &str, path: &Path) -> Option<()> {
        match self {
            AclTool::Setfacl => try_setfacl_remove(user, path),
            AclTool::Icacls => try_icacls_remove(user, path),
            AclTool::Chmod => try_chmod_remove(user, path),
        }
    }
}

fn run_unchecked(command: &mut Command) {
    match command.output() {
        Ok(output) if !output.status.success() => {
            trace!(
                "{} exited with {}: {}",
                command.get_program().to_string_lossy(),
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(_) => {}
        Err(e) => {
            trace!(
                "Failed to run {}: {}",
                command.get_program().to_string_lossy(),
                e
            );
        }
    }
}

fn try_setfacl_remove(user: &str, path: &Path) -> Option<()> {
    let setfacl = which("setfacl")?;
    run_unchecked(
        Command::new(setfacl)
            .args(["-R", "-x"])
            .arg(format!("u:{}", user))
            .arg(path),
    );
    Some(())
}

fn try_icacls_remove(user: &str, path: &Path) -> Option<()> {
    let icacls = which("icacls")?;
    run_unchecked(
        Command::new(icacls)
            .arg(path)
            .args(["/remove", user, "/t"]),
    );
    Some(())
}

fn try_chmod_remove(user: &str, path: &Path) -> Option<()> {
    let chmod = which("chmod")?;
    // Entries are removed permission group by permission group; groups that
    // were never granted simply fail and are ignored.
    const PERM_GROUPS: [&str; 7] = [
        "read,readattr,readextattr,readsecurity,file_inherit,directory_inherit",
        "list,search",
        "read",
        "delete,writeattr,writeextattr,writesecurity,chown",
        "add_file,add_subdirectory,delete_child",
        "write,append",
        "execute",
    ];
    for group in PERM_GROUPS {
        run_unchecked(
            Command::new(&chmod)
                .arg("-a")
                .arg(format!("{} allow {}", user, group))
                .arg(path),
        );
    }
    Some(())
}
