//! File access for manifests.
//!
//! Scanning and mutation read and write through [`ManifestStore`] so a whole
//! batch can run against the real filesystem or against a store that injects
//! failures.

use std::io;
use std::path::Path;

/// Whole-file async access to manifests
#[allow(async_fn_in_trait)]
pub trait ManifestStore {
    /// Read the full UTF-8 content of a manifest
    async fn read(&self, path: &Path) -> io::Result<String>;

    /// Replace the full content of a manifest
    async fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// Filesystem-backed store using `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl ManifestStore for FsStore {
    async fn read(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }
}
