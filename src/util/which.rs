use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

/// Locate an executable tool on PATH. Platform strategies use a missing
/// tool as their signal to stand aside rather than failing outright.
pub fn which(tool: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(tool);
        if let Ok(metadata) = candidate.metadata() {
            if metadata.is_file()
                && metadata.permissions().mode() & 0o111 != 0
            {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_which_finds_sh() {
        let sh = which("sh");
        assert!(sh.is_some());
        assert!(sh.unwrap().is_absolute());
    }

    #[test]
    fn test_which_missing_tool() {
        assert!(which("ubox-no-such-tool-exists").is_none());
    }
}
