use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const TMPROOT_PREFIX: &str = "ubox_tmp_";

/// One sandbox's durable state. `user` and `password` are absent between
/// the record being persisted and provisioning completing, which is exactly
/// the window a crash leaves behind for reclamation to find.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SandboxRecord {
    pub tmproot: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_deletion_lock: Option<String>,
}

/// The durable ledger of all live sandboxes, keyed by id. No two records
/// may share an id or a tmproot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub records: BTreeMap<String, SandboxRecord>,
}

/// Recover a sandbox id from its tmproot path. Tmproots are always named
/// `<prefix><id>` directly under the temp directory.
pub fn tmproot_to_id(tmproot: &Path) -> Result<String> {
    let name = tmproot
        .file_name()
        .and_then(|name| name.to_str())
        .context(format!("Invalid sandbox root {}", tmproot.display()))?;
    match name.strip_prefix(TMPROOT_PREFIX) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(anyhow!(
            "{} is not a sandbox root (expected a {}* directory)",
            tmproot.display(),
            TMPROOT_PREFIX
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmproot_to_id() -> Result<()> {
        let id = tmproot_to_id(Path::new("/tmp/ubox_tmp_abc123def456"))?;
        assert_eq!(id, "abc123def456");
        Ok(())
    }

    #[test]
    fn test_tmproot_to_id_rejects_foreign_paths() {
        assert!(tmproot_to_id(Path::new("/tmp/some_other_dir")).is_err());
        assert!(tmproot_to_id(Path::new("/tmp/ubox_tmp_")).is_err());
        assert!(tmproot_to_id(Path::new("/")).is_err());
    }

    #[test]
    fn test_record_deserializes_with_defaults() -> Result<()> {
        let record: SandboxRecord =
            serde_json::from_str(r#"{"tmproot": "/tmp/ubox_tmp_x"}"#)?;
        assert_eq!(record.tmproot, PathBuf::from("/tmp/ubox_tmp_x"));
        assert!(record.user.is_none());
        assert!(record.password.is_none());
        assert!(record.shared.is_empty());
        assert!(record.pending_deletion_lock.is_none());
        Ok(())
    }

    #[test]
    fn test_manifest_is_a_flat_id_map() -> Result<()> {
        let mut manifest = Manifest::default();
        manifest.records.insert(
            "abc".to_string(),
            SandboxRecord {
                tmproot: PathBuf::from("/tmp/ubox_tmp_abc"),
                ..Default::default()
            },
        );
        let json = serde_json::to_string(&manifest)?;
        assert!(json.starts_with(r#"{"abc":"#));
        let parsed: Manifest = serde_json::from_str(&json)?;
        assert_eq!(parsed, manifest);
        Ok(())
    }
}
