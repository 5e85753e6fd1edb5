//! Test harness helpers.

use std::sync::Once;

use configbus_storage::FileKvStore;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test writer, once per process.
///
/// Honours `RUST_LOG`; defaults to `warn`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A [`FileKvStore`] in a fresh temporary directory.
///
/// The directory is deleted when the returned [`TempDir`] is dropped.
///
/// # Panics
///
/// Panics if the directory or store cannot be created.
#[must_use]
pub fn temp_file_store() -> (TempDir, FileKvStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = FileKvStore::open(dir.path()).expect("open file store");
    (dir, store)
}
