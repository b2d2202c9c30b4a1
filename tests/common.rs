//! Test utilities & fixtures.
//! Opens a fresh store in a temp dir and optionally loads the shipped
//! catalog seeds from data/seeds.

use std::path::{Path, PathBuf};

use dragonkeep::game::{self, GameStore, GameStoreBuilder};
use tempfile::TempDir;

/// Path to the catalog seed files shipped with the crate.
pub fn seeds_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("seeds")
}

/// Fresh empty store. The `TempDir` must outlive the store.
pub fn open_store() -> (TempDir, GameStore) {
    let dir = TempDir::new().expect("tempdir");
    let store = GameStoreBuilder::new(dir.path()).open().expect("store");
    (dir, store)
}

/// Fresh store with the shipped catalog loaded.
#[allow(dead_code)] // Not every test crate needs the seeded variant.
pub fn open_seeded_store() -> (TempDir, GameStore) {
    let (dir, store) = open_store();
    game::seed_catalog(&store, seeds_dir()).expect("seed catalog");
    (dir, store)
}
