use std::path::PathBuf;

use rand::Rng;
use ubox::manifest::{Manifest, ManifestStore, SandboxRecord, TMPROOT_PREFIX};

pub fn rid() -> String {
    let mut rng = rand::rng();
    (0..10)
        .map(|_| rng.sample(rand::distr::Alphanumeric) as char)
        .collect::<String>()
        .to_lowercase()
}

/// A manifest store rooted in a unique temp directory so concurrent tests
/// never see each other's state.
pub fn test_store() -> ManifestStore {
    ManifestStore::new(
        std::env::temp_dir()
            .join(format!("ubox-test-{}", rid()))
            .join("manifest.json"),
    )
}

/// A tmproot path in the conventional location, without creating it.
pub fn tmproot_for(id: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}{}", TMPROOT_PREFIX, id))
}

/// Seed a store with a single record and return its manifest.
pub fn seed_record(
    store: &ManifestStore,
    id: &str,
    record: SandboxRecord,
) -> Manifest {
    let mut manifest = Manifest::default();
    manifest.records.insert(id.to_string(), record);
    store
        .write(&manifest)
        .expect("failed to seed test manifest");
    manifest
}
