//! The cache catalogue: persisted mapping of lineage signatures to
//! materialized-result URIs.
//!
//! A JSON list of `(lineage, uri, created_at)` records stored as
//! `catalogue.json` under the materialization base directory, written
//! atomically. The lineage signature is the *only* identity used to match
//! cached data to operators.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CacheError;

/// One cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub lineage: String,
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory view of the persisted catalogue.
#[derive(Debug, Clone, Default)]
pub struct CacheCatalogue {
    path: PathBuf,
    entries: Vec<CatalogueEntry>,
}

impl CacheCatalogue {
    /// Catalogue file under a materialization base directory.
    pub fn file_path(base_dir: &Path) -> PathBuf {
        base_dir.join("catalogue.json")
    }

    /// Load the catalogue for a base directory; a missing file yields an
    /// empty catalogue.
    pub fn load(base_dir: &Path) -> Result<Self, CacheError> {
        let path = Self::file_path(base_dir);
        if !path.exists() {
            debug!(path = %path.display(), "no catalogue yet, starting empty");
            return Ok(CacheCatalogue {
                path,
                entries: Vec::new(),
            });
        }
        let json = std::fs::read_to_string(&path).map_err(|e| CacheError::Catalogue {
            message: e.to_string(),
        })?;
        let entries = serde_json::from_str(&json).map_err(|e| CacheError::Catalogue {
            message: e.to_string(),
        })?;
        Ok(CacheCatalogue { path, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, lineage: &str) -> Option<&CatalogueEntry> {
        self.entries.iter().find(|e| e.lineage == lineage)
    }

    /// Register a materialized result; an existing entry for the lineage
    /// is overwritten.
    pub fn insert(&mut self, lineage: &str, uri: &str) {
        self.entries.retain(|e| e.lineage != lineage);
        self.entries.push(CatalogueEntry {
            lineage: lineage.to_string(),
            uri: uri.to_string(),
            created_at: Utc::now(),
        });
    }

    pub fn remove(&mut self, lineage: &str) {
        self.entries.retain(|e| e.lineage != lineage);
    }

    /// Persist atomically: temp file, then rename.
    pub fn save(&self) -> Result<(), CacheError> {
        let mut json =
            serde_json::to_string_pretty(&self.entries).map_err(|e| CacheError::Catalogue {
                message: e.to_string(),
            })?;
        json.push('\n');
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Catalogue {
                message: e.to_string(),
            })?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| CacheError::Catalogue {
            message: e.to_string(),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| CacheError::Catalogue {
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut catalogue = CacheCatalogue::load(dir.path()).unwrap();
        assert!(catalogue.is_empty());

        catalogue.insert("abc123", "/mat/abc123");
        catalogue.save().unwrap();

        let reloaded = CacheCatalogue::load(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.lookup("abc123").unwrap().uri, "/mat/abc123");
        assert!(reloaded.lookup("missing").is_none());
    }

    #[test]
    fn test_insert_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut catalogue = CacheCatalogue::load(dir.path()).unwrap();
        catalogue.insert("abc", "/old");
        catalogue.insert("abc", "/new");
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.lookup("abc").unwrap().uri, "/new");
    }
}
