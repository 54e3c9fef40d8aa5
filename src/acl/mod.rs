mod grant;
mod revoke;
mod share;

pub use grant::*;
pub use revoke::*;
pub use share::*;

/// One platform ACL-editing strategy, dispatched like account strategies:
/// host variant first, fixed fallback order, missing tool means "not me".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclTool {
    /// POSIX extended ACLs (Linux, FreeBSD)
    Setfacl,
    /// Windows ACL inheritance
    Icacls,
    /// macOS extended permission entries via chmod +a
    Chmod,
}

const FIXED_ORDER: [AclTool; 3] =
    [AclTool::Setfacl, AclTool::Icacls, AclTool::Chmod];

impl AclTool {
    fn host() -> Option<AclTool> {
        if cfg!(any(target_os = "linux", target_os = "freebsd")) {
            Some(AclTool::Setfacl)
        } else if cfg!(windows) {
            Some(AclTool::Icacls)
        } else if cfg!(target_os = "macos") {
            Some(AclTool::Chmod)
        } else {
            None
        }
    }

    pub fn queue() -> Vec<AclTool> {
        let mut queue = Vec::with_capacity(FIXED_ORDER.len());
        if let Some(host) = AclTool::host() {
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
