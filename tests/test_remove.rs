// Sandbox removal is best-effort and idempotent: every destructive step
// tolerates already-gone state, and removing the same sandbox twice changes
// nothing.

mod fixtures;

use anyhow::Result;
use fixtures::*;
use rstest::*;

use ubox::manifest::SandboxRecord;
use ubox::sandbox::Sandbox;

#[rstest]
fn test_remove_deletes_directory_and_record() -> Result<()> {
    let store = test_store();
    let id = rid();
    let tmproot = tmproot_for(&id);
    std::fs::create_dir(&tmproot)?;
    std::fs::write(tmproot.join("scratch"), "data")?;
    let record = SandboxRecord {
        tmproot: tmproot.clone(),
        ..Default::default()
    };
    seed_record(&store, &id, record.clone());

    let sandbox = Sandbox::from_record(id.clone(), record);
    sandbox.remove(&store)?;

    assert!(!tmproot.exists());
    assert!(store.read().records.is_empty());
    Ok(())
}

#[rstest]
fn test_remove_twice_is_a_noop() -> Result<()> {
    let store = test_store();
    let id = rid();
    let tmproot = tmproot_for(&id);
    std::fs::create_dir(&tmproot)?;
    let record = SandboxRecord {
        tmproot,
        ..Default::default()
    };
    seed_record(&store, &id, record.clone());

    let sandbox = Sandbox::from_record(id, record);
    sandbox.remove(&store)?;
    let after_first = store.read();
    sandbox.remove(&store)?;
    assert_eq!(store.read(), after_first);
    Ok(())
}

#[rstest]
fn test_remove_never_provisioned_record() -> Result<()> {
    // A crash between persisting the record and provisioning the account
    // leaves a record with no user; removal must still succeed
    let store = test_store();
    let id = rid();
    let record = SandboxRecord {
        tmproot: tmproot_for(&id),
        ..Default::default()
    };
    seed_record(&store, &id, record.clone());

    Sandbox::from_record(id, record).remove(&store)?;
    assert!(store.read().records.is_empty());
    Ok(())
}
