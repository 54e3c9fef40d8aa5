use std::io::ErrorKind;

use anyhow::Result;
use log::{debug, warn};

use crate::acl::unshare;
use crate::lock::{GLOBAL_LOCK_NAME, Lock};
use crate::manifest::{ManifestStore, SandboxRecord};
use crate::principal::remove_account;
use crate::sandbox::Sandbox;

impl Sandbox {
    /// Destroy the sandbox: directory, grants, account, manifest entry.
    /// Idempotent; removing an already-removed sandbox changes nothing.
    pub fn remove(&self, store: &ManifestStore) -> Result<()> {
        debug!("Removing sandbox {}", self.id);
        teardown(&self.record);
        let _global = Lock::acquire(GLOBAL_LOCK_NAME)?;
        let mut manifest = store.read();
        if manifest.records.remove(&self.id).is_some() {
            store.write(&manifest)?;
        }
        Ok(())
    }
}

/// The three destructive steps, sequenced independently so one failure does
/// not block the others. Whatever survives stays discoverable in the
/// manifest and is retried by a later reclamation pass.
pub(crate) fn teardown(record: &SandboxRecord) {
    match std::fs::remove_dir_all(&record.tmproot) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            warn!("Failed to remove {}: {}", record.tmproot.display(), e);
        }
    }
    for path in &record.shared {
        unshare(record, path);
    }
    if let Some(user) = record.user.as_deref() {
        if let Err(e) = remove_account(user) {
            warn!("Failed to remove account {}: {:#}", user, e);
        }
    }
}
