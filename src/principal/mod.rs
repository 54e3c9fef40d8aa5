mod deprovision;
mod provision;

pub use deprovision::*;
pub use provision::*;

pub const USER_PREFIX: &str = "ubox";

/// Account name for a sandbox id. With a 12-character id this is 16
/// characters, the FreeBSD username limit.
pub fn account_name(id: &str) -> String {
    format!("{}{}", USER_PREFIX, id)
}

/// One platform account-management strategy. Variants self-report
/// inapplicability (their tool is absent) instead of callers branching on
/// the OS, so a host missing its native tool falls through to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountTool {
    /// shadow-utils useradd/userdel (Linux)
    Useradd,
    /// net user (Windows)
    NetUser,
    /// dscl directory services (macOS)
    Dscl,
    /// adduser/rmuser (FreeBSD)
    Adduser,
}

const FIXED_ORDER: [AccountTool; 4] = [
    AccountTool::Useradd,
    AccountTool::NetUser,
    AccountTool::Dscl,
    AccountTool::Adduser,
];

impl AccountTool {
    fn host() -> Option<AccountTool> {
        if cfg!(target_os = "linux") {
            Some(AccountTool::Useradd)
        } else if cfg!(windows) {
            Some(AccountTool::NetUser)
        } else if cfg!(target_os = "macos") {
            Some(AccountTool::Dscl)
        } else if cfg!(target_os = "freebsd") {
            Some(AccountTool::Adduser)
        } else {
            None
        }
    }

    /// The host platform's variant first, then the remaining variants in
    /// fixed order.
    pub fn queue() -> Vec<AccountTool> {
        let mut queue = Vec::with_capacity(FIXED_ORDER.len());
        if let Some(host) = AccountTool::host() {
            queue.push(host);
        }
        for tool in FIXED_ORDER {
            if !queue.contains(&tool) {
                queue.push(tool);
            }
        }
        queue
    }
}
