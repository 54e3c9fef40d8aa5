use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

use anyhow::{Result, anyhow};
use log::debug;
use rand::Rng;

use crate::principal::{AccountTool, account_name};
use crate::util::{generate_id, run_tool, which};

/// A freshly provisioned account: its name, and a password when the
/// strategy that created it requires a credential-based launch later
/// (net user); in-kernel identity switches need none.
pub struct Account {
    pub user: String,
    pub password: Option<String>,
}

/// Provision a throwaway account for a sandbox, trying the host platform's
/// strategy first and falling through the rest.
pub fn create_account(id: &str, tmproot: &Path) -> Result<Account> {
    for tool in AccountTool::queue() {
        if let Some(account) = tool.try_create(id, tmproot)? {
            debug!("Provisioned account {}", account.user);
            return Ok(account);
        }
    }
    Err(anyhow!(
        "Unable to provision an account for sandbox {}: no account management tool available",
        id
    ))
}

impl AccountTool {
    /// Returns None when this variant's tool is not present on the system.
    fn try_create(self, id: &str, tmproot: &Path) -> Result<Option<Account>> {
        match self {
            AccountTool::Useradd => try_useradd(id),
            AccountTool::NetUser => try_net_user_add(id),
            AccountTool::Dscl => try_dscl_create(id, tmproot),
            AccountTool::Adduser => try_adduser(id),
        }
    }
}

fn try_useradd(id: &str) -> Result<Option<Account>> {
    let Some(useradd) = which("useradd") else {
        return Ok(None);
    };
    let user = account_name(id);
    run_tool(Command::new(useradd).arg(&user), &[])?;
    Ok(Some(Account {
        user,
        password: None,
    }))
}

fn try_net_user_add(id: &str) -> Result<Option<Account>> {
    let Some(net) = which("net") else {
        return Ok(None);
    };
    let user = account_name(id);
    let password = generate_id();
    run_tool(
        Command::new(net).args(["user", user.as_str(), password.as_str(), "/add"]),
        &[],
    )?;
    Ok(Some(Account {
        user,
        password: Some(password),
    }))
}

fn try_dscl_create(id: &str, tmproot: &Path) -> Result<Option<Account>> {
    let Some(dscl) = which("dscl") else {
        return Ok(None);
    };
    // macOS group 12 is "everyone"
    const EVERYONE_GID: &str = "12";
    let user = account_name(id);
    let node = format!("/Users/{}", user);
    run_tool(Command::new(&dscl).args([".", "-create", node.as_str()]), &[])?;
    run_tool(
        Command::new(&dscl)
            .args([".", "-create", node.as_str(), "UserShell", "/bin/bash"]),
        &[],
    )?;
    run_tool(
        Command::new(&dscl)
            .args([".", "-create", node.as_str(), "RealName", user.as_str()]),
        &[],
    )?;
    run_tool(
        Command::new(&dscl)
            .args([".", "-create", node.as_str(), "UniqueID"])
            .arg(unused_uid().to_string()),
        &[],
    )?;
    run_tool(
        Command::new(&dscl).args([
            ".",
            "-create",
            node.as_str(),
            "PrimaryGroupID",
            EVERYONE_GID,
        ]),
        &[],
    )?;
    run_tool(
        Command::new(&dscl)
            .arg(".")
            .arg("-create")
            .arg(&node)
            .arg("NFSHomeDirectory")
            .arg(tmproot),
        &[],
    )?;
    Ok(Some(Account {
        user,
        password: None,
    }))
}

fn try_adduser(id: &str) -> Result<Option<Account>> {
    let Some(adduser) = which("adduser") else {
        return Ok(None);
    };
    let user = account_name(id);
    run_tool(Command::new(adduser).arg(&user), &[])?;
    Ok(Some(Account {
        user,
        password: None,
    }))
}

/// Pick a random uid in the dynamic range that no passwd entry uses yet.
fn unused_uid() -> libc::uid_t {
    let mut existing: HashSet<libc::uid_t> = HashSet::new();
    unsafe {
        libc::setpwent();
        loop {
            let entry = libc::getpwent();
            if entry.is_null() {
                break;
            }
            existing.insert((*entry).pw_uid);
        }
        libc::endpwent();
    }
    let mut rng = rand::rng();
    loop {
        let uid = rng.random_range(2000..=u32::from(u16::MAX)) as libc::uid_t;
        if !existing.contains(&uid) {
            return uid;
        }
    }
}
