use std::process::Command;

use anyhow::{Result, anyhow};
use log::debug;
use nix::unistd::User;

use crate::principal::AccountTool;
use crate::util::{run_tool, which};

// "no such user" exit statuses, tolerated so removal stays idempotent
const USERDEL_NOT_FOUND: i32 = 6;
const NET_USER_NOT_FOUND: i32 = 2;

/// Remove a sandbox account, mirroring the provisioning dispatch. Removing
/// an account that is already gone is success.
pub fn remove_account(user: &str) -> Result<()> {
    if User::from_name(user).unwrap_or(None).is_none() && which("net").is_none()
    {
        // No passwd entry and no non-passwd account database to consult
        debug!("Account {} already removed", user);
        return Ok(());
    }
    for tool in AccountTool::queue() {
        if tool.try_remove(user)?.is_some() {
            debug!("Removed account {}", user);
            return Ok(());
        }
    }
    Err(anyhow!(
        "Unable to remove account {}: no account management tool available",
        user
    ))
}

impl AccountTool {
    fn try_remove(self, user: &str) -> Result<Option<()>> {
        match self {
            AccountTool::Useradd => try_userdel(user),
            AccountTool::NetUser => try_net_user_delete(user),
            AccountTool::Dscl => try_dscl_delete(user),
            AccountTool::Adduser => try_rmuser(user),
        }
    }
}

fn try_userdel(user: &str) -> Result<Option<()>> {
    let Some(userdel) = which("userdel") else {
        return Ok(None);
    };
    run_tool(
        Command::new(userdel).args(["-r", user]),
        &[USERDEL_NOT_FOUND],
    )?;
    Ok(Some(()))
}

fn try_net_user_delete(user: &str) -> Result<Option<()>> {
    let Some(net) = which("net") else {
        return Ok(None);
    };
    run_tool(
        Command::new(net).args(["user", user, "/delete"]),
        &[NET_USER_NOT_FOUND],
    )?;
    Ok(Some(()))
}

fn try_dscl_delete(user: &str) -> Result<Option<()>> {
    let Some(dscl) = which("dscl") else {
        return Ok(None);
    };
    let node = format!("/Users/{}", user);
    // dscl errors on a missing record; probe first so removal stays
    // idempotent
    if run_tool(Command::new(&dscl).args([".", "-read", node.as_str()]), &[])
        .is_err()
    {
        return Ok(Some(()));
    }
    run_tool(
        Command::new(&dscl).args([".", "-delete", node.as_str()]),
        &[],
    )?;
    Ok(Some(()))
}

fn try_rmuser(user: &str) -> Result<Option<()>> {
    let Some(rmuser) = which("rmuser") else {
        return Ok(None);
    };
    if User::from_name(user).unwrap_or(None).is_none() {
        return Ok(Some(()));
    }
    run_tool(Command::new(rmuser).args(["-y", user]), &[])?;
    Ok(Some(()))
}
