use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, trace};

use crate::acl::share;
use crate::config::ShareSpec;
use crate::lock::{GLOBAL_LOCK_NAME, Lock};
use crate::manifest::{Manifest, ManifestStore, SandboxRecord, TMPROOT_PREFIX};
use crate::principal::create_account;
use crate::sandbox::{Sandbox, reclaim};
use crate::util::{chown_to, generate_id};

impl Sandbox {
    /// Provision a fresh sandbox: private directory, throwaway account,
    /// requested shares. The record is persisted before the account is
    /// created, so a crash mid-provisioning leaves it discoverable for
    /// reclamation rather than leaked.
    pub fn create(
        store: &ManifestStore,
        shares: &[ShareSpec],
        pending_deletion_lock: Option<&str>,
    ) -> Result<Sandbox> {
        let _global = Lock::acquire(GLOBAL_LOCK_NAME)?;
        let mut manifest = store.read();
        reclaim(store, &mut manifest, true)?;

        let (id, tmproot) = create_tmproot(&manifest)?;
        debug!("Creating sandbox {} at {}", id, tmproot.display());
        manifest.records.insert(
            id.clone(),
            SandboxRecord {
                tmproot: tmproot.clone(),
                pending_deletion_lock: pending_deletion_lock
                    .map(str::to_string),
                ..Default::default()
            },
        );
        store.write(&manifest)?;

        let account = create_account(&id, &tmproot)?;
        {
            let record = manifest
                .records
                .get_mut(&id)
                .context("Sandbox record vanished during provisioning")?;
            record.user = Some(account.user.clone());
            record.password = account.password;
        }
        store.write(&manifest)?;
        chown_to(&tmproot, &account.user)?;

        let mut sorted: Vec<&ShareSpec> = shares.iter().collect();
        sorted.sort_by(|a, b| a.source.cmp(&b.source));
        for spec in sorted {
            share(store, &mut manifest, &id, spec)?;
        }

        let record = manifest
            .records
            .get(&id)
            .cloned()
            .context("Sandbox record vanished during provisioning")?;
        Ok(Sandbox::from_record(id, record))
    }
}

/// Create a uniquely named private root under the temp directory, retrying
/// with a fresh id on any collision.
fn create_tmproot(manifest: &Manifest) -> Result<(String, PathBuf)> {
    loop {
        let id = generate_id();
        if manifest.records.contains_key(&id) {
            continue;
        }
        let tmproot =
            std::env::temp_dir().join(format!("{}{}", TMPROOT_PREFIX, id));
        match std::fs::create_dir(&tmproot) {
            Ok(()) => return Ok((id, tmproot)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                trace!("tmproot collision on {}, regenerating", id);
                continue;
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Failed to create sandbox root {}",
                    tmproot.display()
                ));
            }
        }
    }
}
