use anyhow::{Result, anyhow};

use crate::lock::{GLOBAL_LOCK_NAME, Lock};
use crate::manifest::ManifestStore;
use crate::sandbox::{Sandbox, reclaim};

pub const INTERNAL_FLAG_PREFIX: &str = "UBOX_INTERNAL_";

/// Name of the per-sandbox environment variable that carries the serialized
/// continuation descriptor across the re-exec boundary.
pub fn internal_flag(id: &str) -> String {
    format!("{}{}", INTERNAL_FLAG_PREFIX, id)
}

impl Sandbox {
    /// Fetch a live sandbox by id, optionally taking over its
    /// pending-deletion lease. A record already carrying a pending-deletion
    /// lock is mid-teardown and owned by whichever process holds that lock;
    /// attaching to it is refused unless this invocation is that process's
    /// own re-exec continuation, proven by the internal marker variable.
    pub fn get(
        store: &ManifestStore,
        id: &str,
        pending_deletion_lock: Option<&str>,
    ) -> Result<Sandbox> {
        let _global = Lock::acquire(GLOBAL_LOCK_NAME)?;
        let mut manifest = store.read();
        reclaim(store, &mut manifest, false)?;

        let Some(record) = manifest.records.get_mut(id) else {
            return Err(anyhow!("No sandbox with id {}", id));
        };
        if record.pending_deletion_lock.is_some()
            && std::env::var_os(internal_flag(id)).is_none()
        {
            return Err(anyhow!(
                "Sandbox {} is in use pending deletion by another process",
                id
            ));
        }
        if let Some(name) = pending_deletion_lock {
            record.pending_deletion_lock = Some(name.to_string());
            let record = record.clone();
            store.write(&manifest)?;
            return Ok(Sandbox::from_record(id.to_string(), record));
        }
        Ok(Sandbox::from_record(id.to_string(), record.clone()))
    }
}
