use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{trace, warn};

use crate::manifest::Manifest;

const MANIFEST_FILE: &str = "manifest.json";

/// Durable storage for the manifest with one generation of crash tolerance:
/// each write rotates the previous file to a `.old` backup before writing
/// the new one, and reads fall back to the backup when the primary is
/// missing or corrupt.
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: PathBuf) -> Self {
        ManifestStore { path }
    }

    /// The platform-conventional manifest location: XDG config directory,
    /// Windows application data, or a fixed fallback under the home
    /// directory.
    pub fn default_location() -> Result<ManifestStore> {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            if !xdg.is_empty() {
                return Ok(ManifestStore::new(
                    PathBuf::from(xdg).join("ubox").join(MANIFEST_FILE),
                ));
            }
        }
        if let Some(appdata) = std::env::var_os("APPDATA") {
            if !appdata.is_empty() {
                return Ok(ManifestStore::new(
                    PathBuf::from(appdata).join("ubox").join(MANIFEST_FILE),
                ));
            }
        }
        let home = std::env::var_os("HOME")
            .context("Neither XDG_CONFIG_HOME, APPDATA, nor HOME is set")?;
        Ok(ManifestStore::new(
            PathBuf::from(home)
                .join(".config")
                .join("ubox")
                .join(MANIFEST_FILE),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut backup = self.path.clone().into_os_string();
        backup.push(".old");
        PathBuf::from(backup)
    }

    /// Read the manifest, preferring the primary file, falling back to the
    /// backup generation, and treating a completely absent or unrecoverable
    /// manifest as empty. Corruption is logged, never fatal.
    pub fn read(&self) -> Manifest {
        match load(&self.path) {
            Ok(Some(manifest)) => return manifest,
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "Manifest {} is unreadable ({:#}), trying backup",
                    self.path.display(),
                    e
                );
            }
        }
        match load(&self.backup_path()) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => Manifest::default(),
            Err(e) => {
                warn!(
                    "Manifest backup {} is unreadable ({:#}), starting from an empty manifest",
                    self.backup_path().display(),
                    e
                );
                Manifest::default()
            }
        }
    }

    /// Persist the manifest, rotating the current file to the backup
    /// generation first. A process dying mid-write leaves the previous
    /// generation recoverable.
    pub fn write(&self, manifest: &Manifest) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create manifest directory {}",
                parent.display()
            ))?;
        }
        let backup = self.backup_path();
        match std::fs::remove_file(&backup) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(anyhow!(
                    "Failed to remove old manifest backup {}: {}",
                    backup.display(),
                    e
                ));
            }
        }
        match std::fs::rename(&self.path, &backup) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(anyhow!(
                    "Failed to rotate manifest {} to {}: {}",
                    self.path.display(),
                    backup.display(),
                    e
                ));
            }
        }
        let contents = serde_json::to_string(manifest)
            .context("Failed to serialize manifest")?;
        trace!("Writing manifest {}", self.path.display());
        std::fs::write(&self.path, contents).context(format!(
            "Failed to write manifest {}",
            self.path.display()
        ))?;
        Ok(())
    }
}

fn load(path: &Path) -> Result<Option<Manifest>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow!("Failed to read {}: {}", path.display(), e));
        }
    };
    let manifest = serde_json::from_str(&contents)
        .context(format!("Failed to parse {}", path.display()))?;
    Ok(Some(manifest))
}
