use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use log::debug;
use nix::sys::stat::{Mode, SFlag, stat};

use crate::acl::AclTool;
use crate::util::{run_tool, which};

/// Grant the sandbox principal access to a host path through the first
/// applicable platform ACL mechanism. `read_only` grants never include any
/// write permission.
pub fn grant_access(user: &str, path: &Path, read_only: bool) -> Result<()> {
    for tool in AclTool::queue() {
        if tool.try_grant(user, path, read_only)?.is_some() {
            debug!(
                "Granted {} {} access to {}",
                user,
                if read_only { "read-only" } else { "read-write" },
                path.display()
            );
            return Ok(());
        }
    }
    Err(anyhow!(
        "Unable to grant {} access to {}: no ACL tool available",
        user,
        path.display()
    ))
}

impl AclTool {
    fn try_grant(
        self,
        user: &str,
        path: &Path,
        read_only: bool,
    ) -> Result<Option<()>> {
        match self {
            AclTool::Setfacl => try_setfacl_add(user, path, read_only),
            AclTool::Icacls => try_icacls_grant(user, path, read_only),
            AclTool::Chmod => try_chmod_add(user, path, read_only),
        }
    }
}

fn try_setfacl_add(
    user: &str,
    path: &Path,
    read_only: bool,
) -> Result<Option<()>> {
    let Some(setfacl) = which("setfacl") else {
        return Ok(None);
    };
    let st = stat(path)
        .context(format!("Failed to stat {}", path.display()))?;
    let mut mask = format!("u:{}:r", user);
    if !read_only {
        mask.push('w');
    }
    if st.st_mode & Mode::S_IXUSR.bits() != 0 {
        mask.push('x');
    }
    run_tool(
        Command::new(setfacl).args(["-R", "-m"]).arg(mask).arg(path),
        &[],
    )?;
    Ok(Some(()))
}

fn try_icacls_grant(
    user: &str,
    path: &Path,
    read_only: bool,
) -> Result<Option<()>> {
    let Some(icacls) = which("icacls") else {
        return Ok(None);
    };
    let perm = if read_only { "RX" } else { "F" };
    run_tool(
        Command::new(icacls)
            .arg(path)
            .arg("/grant")
            .arg(format!("{}:{}", user, perm))
            .arg("/t"),
        &[],
    )?;
    Ok(Some(()))
}

fn try_chmod_add(
    user: &str,
    path: &Path,
    read_only: bool,
) -> Result<Option<()>> {
    let Some(chmod) = which("chmod") else {
        return Ok(None);
    };
    let st = stat(path)
        .context(format!("Failed to stat {}", path.display()))?;
    let is_dir =
        st.st_mode & SFlag::S_IFMT.bits() == SFlag::S_IFDIR.bits();
    let mut perms =
        format!("{} allow read,readattr,readextattr,readsecurity,", user);
    if is_dir {
        perms.push_str("list,search,");
    } else {
        perms.push_str("read,");
    }
    if !read_only {
        perms.push_str("delete,writeattr,writeextattr,writesecurity,chown,");
        if is_dir {
            perms.push_str("add_file,add_subdirectory,delete_child,");
        } else {
            perms.push_str("write,append,");
        }
    }
    if st.st_mode & Mode::S_IXUSR.bits() != 0 {
        perms.push_str("execute,");
    }
    perms.push_str("file_inherit,directory_inherit");
    run_tool(Command::new(chmod).arg("+a").arg(perms).arg(path), &[])?;
    Ok(Some(()))
}
