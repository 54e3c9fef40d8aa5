use std::path::Path;

use log::trace;
use nix::unistd::{AccessFlags, access};

/// Check whether the invoking process itself has the requested access level
/// on a path (real uid semantics). A grant is only ever extended for access
/// we already have: read (plus traversal for directories), and write when
/// the share is not read-only.
pub fn have_access(path: &Path, read_only: bool) -> bool {
    let mut flags = AccessFlags::R_OK;
    if path.is_dir() {
        flags |= AccessFlags::X_OK;
    }
    if !read_only {
        flags |= AccessFlags::W_OK;
    }
    let res = access(path, flags);
    trace!(
        "have_access({}, read_only={}) = {}",
        path.display(),
        read_only,
        res.is_ok()
    );
    res.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_have_access_missing_path() {
        assert!(!have_access(Path::new("/ubox-no-such-path"), true));
    }

    #[test]
    fn test_have_access_temp_dir() {
        assert!(have_access(&std::env::temp_dir(), false));
        assert!(have_access(&std::env::temp_dir(), true));
    }
}
