//! Advisory catalog of stored artifacts.
//!
//! Scanning every date bucket is the authoritative way to find an artifact,
//! but it cannot say *which* copy is meant when several buckets hold the same
//! name. The catalog records every artifact as it is written, so the most
//! recently written copy can be preferred.
//!
//! # Design
//!
//! The catalog never overrides the filesystem:
//!
//! 1. Lookups return the newest recorded entry whose file **still exists**.
//! 2. If no recorded entry survives, callers fall back to a bucket scan.
//! 3. A missing, corrupt or wrong-version catalog loads as empty.
//!
//! ## Storage
//!
//! The catalog is a JSON file at `<storage_root>/.catalog.json`. Its leading
//! dot keeps it out of the bucket scan and out of the static mount listing.

use crate::naming;
use crate::storage::Subfolder;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the catalog file within the storage root.
const CATALOG_FILENAME: &str = ".catalog.json";

/// Version of the catalog format. Bump this to discard existing catalogs when
/// the format changes.
const CATALOG_VERSION: u32 = 1;

/// One written artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: Subfolder,
    /// Bucket name, `YYYY-MM-DD`.
    pub date: String,
    pub file: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
}

impl CatalogEntry {
    pub fn bucket(&self) -> Option<NaiveDate> {
        naming::parse_bucket_name(&self.date)
    }
}

/// On-disk catalog mapping keys (original filenames) to what was written for
/// them, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub version: u32,
    pub entries: BTreeMap<String, Vec<CatalogEntry>>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self {
            version: CATALOG_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the storage root. Returns an empty catalog if the file
    /// doesn't exist or can't be parsed.
    pub fn load(root: &Path) -> Self {
        let content = match std::fs::read_to_string(catalog_path(root)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let catalog: Self = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable catalog");
                return Self::empty();
            }
        };
        if catalog.version != CATALOG_VERSION {
            return Self::empty();
        }
        catalog
    }

    /// Save to the storage root, creating it if needed.
    pub fn save(&self, root: &Path) -> io::Result<()> {
        std::fs::create_dir_all(root)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(catalog_path(root), json)
    }

    /// Record an artifact written for `key`.
    ///
    /// Re-writing the same file in the same bucket replaces the old entry and
    /// moves it to the end, since the file on disk was overwritten.
    pub fn record(&mut self, key: &str, entry: CatalogEntry) {
        let list = self.entries.entry(key.to_string()).or_default();
        list.retain(|e| !(e.kind == entry.kind && e.date == entry.date && e.file == entry.file));
        list.push(entry);
    }

    /// Recorded entries of one kind for `key`, newest first.
    pub fn recorded(&self, key: &str, kind: Subfolder) -> impl Iterator<Item = &CatalogEntry> {
        self.entries
            .get(key)
            .into_iter()
            .flat_map(|list| list.iter().rev())
            .filter(move |e| e.kind == kind)
    }

    /// Number of keys with at least one entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve the catalog path for a storage root.
pub fn catalog_path(root: &Path) -> PathBuf {
    root.join(CATALOG_FILENAME)
}
