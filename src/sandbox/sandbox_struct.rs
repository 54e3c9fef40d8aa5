use anyhow::{Context, Result};

use crate::manifest::SandboxRecord;

/// In-memory handle on one sandbox: its id plus a scratch copy of the
/// manifest record. The manifest stays the source of truth; scratch copies
/// are reconciled back into it under the global lock.
#[derive(Debug, Clone, PartialEq)]
pub struct Sandbox {
    pub id: String,
    pub record: SandboxRecord,
}

impl Sandbox {
    pub fn from_record(id: String, record: SandboxRecord) -> Sandbox {
        Sandbox { id, record }
    }

    pub fn user(&self) -> Result<&str> {
        self.record.user.as_deref().context(format!(
            "Sandbox {} has no provisioned principal",
            self.id
        ))
    }
}
