//! Filesystem service used for lineage stability and cache hygiene.
//!
//! `Load` folds its file's modification time into the lineage signature so
//! that editing an input invalidates cached materializations. The trait
//! keeps that dependency behind a seam so tests can run against a fixed
//! clock and HDFS-style backends can slot in later.

use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::error::Result;

/// Minimal filesystem contract the compiler depends on.
pub trait FsService {
    /// Modification time of `path` in milliseconds since the epoch.
    fn last_modified(&self, path: &Path) -> Result<i64>;

    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Remove `path` (file or directory tree).
    fn delete(&self, path: &Path) -> Result<()>;
}

/// Local-disk implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FsService for LocalFs {
    fn last_modified(&self, path: &Path) -> Result<i64> {
        let meta = std::fs::metadata(path)?;
        let modified = meta.modified()?;
        let millis = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Ok(millis)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn delete(&self, path: &Path) -> Result<()> {
        if path.is_dir() {
            std::fs::remove_dir_all(path)?;
        } else if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Fixed-answer filesystem for deterministic tests.
#[derive(Debug, Default, Clone)]
pub struct StaticFs {
    /// Modification time reported for every path.
    pub mtime: i64,
}

impl FsService for StaticFs {
    fn last_modified(&self, _path: &Path) -> Result<i64> {
        Ok(self.mtime)
    }

    fn exists(&self, _path: &Path) -> bool {
        true
    }

    fn delete(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
