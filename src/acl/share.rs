use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};

use crate::acl::{grant_access, revoke_access};
use crate::config::ShareSpec;
use crate::manifest::{Manifest, ManifestStore, SandboxRecord};
use crate::util::have_access;

/// Grant the sandbox principal access to a host path and record the grant
/// in the manifest (persisted before the ACL edit so a crash leaves the
/// grant discoverable for revocation). Silently a no-op when the invoking
/// process itself lacks the requested access level on the source.
pub fn share(
    store: &ManifestStore,
    manifest: &mut Manifest,
    id: &str,
    spec: &ShareSpec,
) -> Result<()> {
    let source = std::path::absolute(&spec.source).context(format!(
        "Failed to resolve share source {}",
        spec.source.display()
    ))?;
    if !have_access(&source, spec.read_only) {
        debug!(
            "Not sharing {}: the invoking process lacks {} access",
            source.display(),
            if spec.read_only { "read" } else { "read-write" }
        );
        return Ok(());
    }
    let record = manifest
        .records
        .get_mut(id)
        .context(format!("No sandbox with id {}", id))?;
    let user = record
        .user
        .clone()
        .context(format!("Sandbox {} has no principal to share with", id))?;
    let tmproot = record.tmproot.clone();
    record.shared.push(source.clone());
    store.write(manifest)?;
    grant_access(&user, &source, spec.read_only)?;
    if let Some(dest) = &spec.dest {
        link_into_sandbox(&tmproot, dest, &source)?;
    }
    Ok(())
}

/// Revoke a grant during teardown. Best-effort: a vanished path or a
/// missing ACL entry must not block the rest of the teardown.
pub fn unshare(record: &SandboxRecord, path: &Path) {
    let Some(user) = record.user.as_deref() else {
        return;
    };
    if !path.exists() {
        // The ACL entries died with the path
        return;
    }
    if let Err(e) = revoke_access(user, path) {
        warn!("Failed to revoke {} access to {}: {:#}", user, path.display(), e);
    }
}

/// Map an absolute host path to the equivalent location under a sandbox
/// root by re-rooting its normal components.
pub fn sandbox_path(tmproot: &Path, path: &Path) -> PathBuf {
    let mut out = tmproot.to_path_buf();
    for component in path.components() {
        if let Component::Normal(part) = component {
            out.push(part);
        }
    }
    out
}

/// Plant a symlink inside the sandbox root pointing at a shared source, so
/// the sandboxed command sees the share at its requested destination.
fn link_into_sandbox(
    tmproot: &Path,
    dest: &Path,
    source: &Path,
) -> Result<()> {
    let dest = std::path::absolute(dest).context(format!(
        "Failed to resolve share destination {}",
        dest.display()
    ))?;
    let link = sandbox_path(tmproot, &dest);
    if link == *tmproot {
        return Err(anyhow!(
            "Share destination {} resolves to the sandbox root itself",
            dest.display()
        ));
    }
    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent).context(format!(
            "Failed to create {} inside the sandbox",
            parent.display()
        ))?;
    }
    std::os::unix::fs::symlink(source, &link).context(format!(
        "Failed to link {} to {}",
        link.display(),
        source.display()
    ))?;
    Ok(())
}
