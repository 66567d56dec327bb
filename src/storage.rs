//! Date-bucketed artifact storage.
//!
//! Every artifact lives at `<root>/<YYYY-MM-DD>/<subfolder>/<file>`, where the
//! date is the day the artifact was *written*, not the day its original was
//! uploaded:
//!
//! ```text
//! storage/
//! ├── 2024-05-01/
//! │   ├── originals/beach.jpg
//! │   └── shrunk/beach.webp
//! └── 2024-05-02/
//!     └── upscaled/upscaled_beach.jpg   # upscaled a day later
//! ```
//!
//! Because derivatives of one key can end up in different buckets, lookups
//! scan every bucket. When several buckets hold the same name the newest
//! bucket wins.

use crate::naming;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The three artifact directories inside a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subfolder {
    Originals,
    Shrunk,
    Upscaled,
}

impl Subfolder {
    pub const ALL: [Subfolder; 3] = [Self::Originals, Self::Shrunk, Self::Upscaled];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Originals => "originals",
            Self::Shrunk => "shrunk",
            Self::Upscaled => "upscaled",
        }
    }
}

impl fmt::Display for Subfolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where "today" comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// The local wall clock.
    Local,
    Fixed(NaiveDate),
}

impl DateSource {
    pub fn today(self) -> NaiveDate {
        match self {
            Self::Local => Local::now().date_naive(),
            Self::Fixed(date) => date,
        }
    }
}

/// A stored artifact found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub date: NaiveDate,
    pub subfolder: Subfolder,
    pub filename: String,
    pub path: PathBuf,
}

impl Located {
    /// `YYYY-MM-DD/<subfolder>/<file>`, always with forward slashes.
    pub fn relative_path(&self) -> String {
        relative_path(self.date, self.subfolder, &self.filename)
    }
}

/// `YYYY-MM-DD/<subfolder>/<file>` for an artifact.
pub fn relative_path(date: NaiveDate, subfolder: Subfolder, filename: &str) -> String {
    format!("{}/{}/{}", naming::bucket_name(date), subfolder, filename)
}

/// Handle on a storage root.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    dates: DateSource,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dates: DateSource::Local,
        }
    }

    /// Storage whose "today" never changes.
    pub fn with_fixed_date(root: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            root: root.into(),
            dates: DateSource::Fixed(date),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn today(&self) -> NaiveDate {
        self.dates.today()
    }

    /// Path of a subfolder in a given bucket. Nothing is created.
    pub fn dir(&self, date: NaiveDate, subfolder: Subfolder) -> PathBuf {
        self.root
            .join(naming::bucket_name(date))
            .join(subfolder.as_str())
    }

    /// Today's directory for `subfolder`, created if absent.
    pub fn today_dir(&self, subfolder: Subfolder) -> io::Result<PathBuf> {
        let dir = self.dir(self.today(), subfolder);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Where an artifact written today would go.
    pub fn today_target(&self, subfolder: Subfolder, filename: &str) -> io::Result<Located> {
        let date = self.today();
        let path = self.today_dir(subfolder)?.join(filename);
        Ok(Located {
            date,
            subfolder,
            filename: filename.to_string(),
            path,
        })
    }

    /// All date buckets, newest first. A missing root has no buckets.
    pub fn buckets(&self) -> io::Result<Vec<NaiveDate>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut dates = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if let Some(date) = entry.file_name().to_str().and_then(naming::parse_bucket_name) {
                dates.push(date);
            }
        }
        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    /// Search every bucket, newest first, for `<subfolder>/<filename>`.
    pub fn find(&self, subfolder: Subfolder, filename: &str) -> io::Result<Option<Located>> {
        Ok(self.find_all(subfolder, filename)?.into_iter().next())
    }

    /// Every bucket holding `<subfolder>/<filename>`, newest first.
    pub fn find_all(&self, subfolder: Subfolder, filename: &str) -> io::Result<Vec<Located>> {
        let mut found = Vec::new();
        for date in self.buckets()? {
            let path = self.dir(date, subfolder).join(filename);
            if path.is_file() {
                found.push(Located {
                    date,
                    subfolder,
                    filename: filename.to_string(),
                    path,
                });
            }
        }
        Ok(found)
    }

    /// Resolve a path recorded elsewhere (e.g. the catalog) back to an
    /// artifact, if it is still on disk.
    pub fn existing(
        &self,
        date: NaiveDate,
        subfolder: Subfolder,
        filename: &str,
    ) -> Option<Located> {
        let path = self.dir(date, subfolder).join(filename);
        path.is_file().then(|| Located {
            date,
            subfolder,
            filename: filename.to_string(),
            path,
        })
    }
}
