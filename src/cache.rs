//! Day-keyed file cache for fetched event sets.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use log::warn;
use tempfile::NamedTempFile;

use crate::event::Event;

/// On-disk cache holding one JSON file per (event type, calendar day).
///
/// Records are never updated in place: a new day produces a new file, and
/// stale files are left behind for the operator to clean up.
#[derive(Debug, Clone)]
pub struct EventCache {
    dir: PathBuf,
}

impl EventCache {
    /// Create a cache rooted at `dir`. The directory is created lazily on
    /// the first `store`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Today's cache file for `event_type`, with characters illegal in
    /// file names substituted.
    pub fn file_path(&self, event_type: &str) -> PathBuf {
        let safe = event_type.replace("::", "_").replace(['<', '>'], "_");
        let date = Local::now().format("%Y%m%d");
        self.dir.join(format!("{safe}_events_{date}.json"))
    }

    /// Load today's cached event set, if a valid one exists.
    ///
    /// An absent file and a file that does not deserialize to an event list
    /// are both a miss; a corrupt file is left for the next `store` to
    /// overwrite.
    pub fn load(&self, event_type: &str) -> Option<Vec<Event>> {
        let path = self.file_path(event_type);
        let data = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(events) => Some(events),
            Err(e) => {
                warn!(
                    "cache file {} is not a valid event list ({e}); refetching",
                    path.display()
                );
                None
            }
        }
    }

    /// Persist a fetched event set for today, replacing any previous file
    /// under the same key.
    ///
    /// The set is written to a temporary file in the cache directory and
    /// renamed into place, so an interrupted run never replaces a valid
    /// cache with a truncated one.
    pub fn store(&self, event_type: &str, events: &[Event]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating cache directory {}", self.dir.display()))?;
        let path = self.file_path(event_type);
        let tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&tmp, events)?;
        tmp.persist(&path)
            .with_context(|| format!("replacing cache file {}", path.display()))?;
        Ok(())
    }
}
