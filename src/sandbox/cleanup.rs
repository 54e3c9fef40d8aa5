use anyhow::Result;
use log::info;

use crate::lock::{GLOBAL_LOCK_NAME, Lock, lock_held};
use crate::manifest::{Manifest, ManifestStore};
use crate::sandbox::remove::teardown;

/// Tear down every sandbox whose owning process has died (its
/// pending-deletion lock is nameable but no longer held by anyone) or whose
/// tmproot has vanished. This is the only reclamation path; there is no
/// supervising daemon, so every create and get runs it opportunistically.
/// Callers that are about to persist the manifest anyway pass `defer_write`.
pub fn reclaim(
    store: &ManifestStore,
    manifest: &mut Manifest,
    defer_write: bool,
) -> Result<()> {
    let mut reclaimable = Vec::new();
    for (id, record) in &manifest.records {
        let abandoned = match record.pending_deletion_lock.as_deref() {
            Some(name) => !lock_held(name)?,
            None => false,
        };
        if abandoned || !record.tmproot.exists() {
            reclaimable.push(id.clone());
        }
    }
    for id in &reclaimable {
        if let Some(record) = manifest.records.remove(id) {
            info!("Reclaiming abandoned sandbox {}", id);
            teardown(&record);
        }
    }
    if !defer_write && !reclaimable.is_empty() {
        store.write(manifest)?;
    }
    Ok(())
}

/// Standalone reclamation pass over the persisted manifest.
pub fn cleanup(store: &ManifestStore) -> Result<()> {
    let _global = Lock::acquire(GLOBAL_LOCK_NAME)?;
    let mut manifest = store.read();
    reclaim(store, &mut manifest, false)
}
