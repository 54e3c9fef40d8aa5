use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use log::trace;
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

pub const GLOBAL_LOCK_NAME: &str = "ubox_global_lock";
const PROC_LOCK_PREFIX: &str = "ubox_proc_lock_";

/// Name of the pending-deletion lock owned by this process. Named by pid
/// because the OS drops the flock when the process dies, crash included,
/// which is what marks a sandbox as abandoned. A recycled pid can make a
/// dead owner's lock look held until the recycling process exits.
pub fn process_lock_name() -> String {
    format!("{}{}", PROC_LOCK_PREFIX, std::process::id())
}

/// A named advisory lock backed by a flock'd file in the temp directory.
/// Released on drop and, because flock is tied to the open file description,
/// on process death through any path including SIGKILL.
///
/// flock conflicts across file descriptions even within one process, which
/// is what makes `lock_held` probe our own locks correctly. The flip side
/// is that nested acquisition does not work: a second blocking `acquire` of
/// a name this process already holds waits on itself, so a name is never
/// taken twice without releasing it first.
pub struct Lock {
    name: String,
    #[allow(dead_code)]
    lock: Flock<File>,
}

impl Lock {
    /// Acquire the named lock, blocking until it is free.
    pub fn acquire(name: &str) -> Result<Lock> {
        let file = open_lock_file(name)?;
        trace!("Acquiring lock {}", name);
        let lock = Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_, e)| anyhow!("Failed to acquire lock {}: {}", name, e))?;
        trace!("Acquired lock {}", name);
        Ok(Lock {
            name: name.to_string(),
            lock,
        })
    }

    /// Try to acquire the named lock without blocking. Returns None when
    /// another holder exists, including another Lock in this same process.
    pub fn try_acquire(name: &str) -> Result<Option<Lock>> {
        let file = open_lock_file(name)?;
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => Ok(Some(Lock {
                name: name.to_string(),
                lock,
            })),
            Err((_, Errno::EWOULDBLOCK)) => Ok(None),
            Err((_, e)) => Err(anyhow!("Failed to probe lock {}: {}", name, e)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        trace!("Releasing lock {}", self.name);
    }
}

/// Whether anyone, anywhere, currently holds the named lock. Implemented as
/// a non-blocking acquire and immediate release: if we can take the lock, no
/// holder exists.
pub fn lock_held(name: &str) -> Result<bool> {
    Ok(Lock::try_acquire(name)?.is_none())
}

fn open_lock_file(name: &str) -> Result<File> {
    let lock_file: PathBuf = std::env::temp_dir().join(name);
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_file)
        .map_err(|e| {
            anyhow!("Failed to open lock file {}: {}", lock_file.display(), e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn lock_name() -> String {
        let mut rng = rand::rng();
        let suffix: String = (0..10)
            .map(|_| rng.sample(rand::distr::Alphanumeric) as char)
            .collect();
        format!("ubox_test_lock_{}", suffix)
    }

    #[test]
    fn test_acquire_and_release() -> Result<()> {
        let name = lock_name();
        let lock = Lock::acquire(&name)?;
        assert_eq!(lock.name(), name);
        drop(lock);
        // Released, so a second acquisition succeeds immediately
        let _lock = Lock::acquire(&name)?;
        Ok(())
    }

    #[test]
    fn test_try_acquire_conflict() -> Result<()> {
        let name = lock_name();
        let held = Lock::try_acquire(&name)?;
        assert!(held.is_some());
        // flock conflicts across file descriptors, even in one process
        assert!(Lock::try_acquire(&name)?.is_none());
        drop(held);
        assert!(Lock::try_acquire(&name)?.is_some());
        Ok(())
    }

    #[test]
    fn test_lock_held() -> Result<()> {
        let name = lock_name();
        assert!(!lock_held(&name)?);
        let guard = Lock::acquire(&name)?;
        assert!(lock_held(&name)?);
        drop(guard);
        assert!(!lock_held(&name)?);
        Ok(())
    }
}
