use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result};
use ubox::manifest::ManifestStore;

use super::rid;

/// Drives the built binary against a private manifest location so
/// concurrent tests never share sandbox state.
pub struct UboxCli {
    config_dir: PathBuf,
    path_override: Option<OsString>,
}

#[allow(dead_code)]
impl UboxCli {
    pub fn new() -> Self {
        UboxCli {
            config_dir: std::env::temp_dir()
                .join(format!("ubox-cli-test-{}", rid())),
            path_override: None,
        }
    }

    /// Restrict the PATH the binary (and everything it launches) sees.
    pub fn with_path(mut self, path: OsString) -> Self {
        self.path_override = Some(path);
        self
    }

    /// A store reading the same manifest the binary writes.
    pub fn store(&self) -> ManifestStore {
        ManifestStore::new(
            self.config_dir.join("ubox").join("manifest.json"),
        )
    }

    pub fn run(&self, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ubox"));
        cmd.args(args).env("XDG_CONFIG_HOME", &self.config_dir);
        if let Some(path) = &self.path_override {
            cmd.env("PATH", path);
        }
        cmd.output().context("failed to run the ubox binary")
    }
}
