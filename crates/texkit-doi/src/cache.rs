//! On-disk cache of DOI check results.
//!
//! The cache is a pretty-printed JSON object mapping each DOI to
//! `{"is_valid": bool, "status": "...", "timestamp": "<local ISO-8601>"}`.
//! Entries younger than [`CACHE_VALIDITY_DAYS`] are reused without a network
//! request. Every write rewrites the whole file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{DoiError, Result};
use crate::status::DoiStatus;

/// File name of the cache in the home directory.
pub const CACHE_FILE_NAME: &str = ".bib_validator";
/// Age after which a cached result is checked again.
pub const CACHE_VALIDITY_DAYS: i64 = 30;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One cached result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DoiStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl CacheRecord {
    fn checked_at(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref()?.parse().ok()
    }
}

/// DOI result cache backed by a JSON file.
#[derive(Debug, Clone)]
pub struct DoiCache {
    path: PathBuf,
    records: BTreeMap<String, CacheRecord>,
}

impl DoiCache {
    /// `~/.bib_validator`, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CACHE_FILE_NAME))
    }

    /// Load the cache at `path`.
    ///
    /// A missing file gives an empty cache; an unreadable or malformed one
    /// gives an empty cache and a warning.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                log::warn!("Could not load cache {}: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                log::warn!("Could not load cache {}: {e}", path.display());
                BTreeMap::new()
            }
        };
        log::debug!("Loaded {} cached DOI results from {}", records.len(), path.display());
        Self { path, records }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn record(&self, doi: &str) -> Option<&CacheRecord> {
        self.records.get(doi)
    }

    /// Whether `doi` was checked less than 30 days ago.
    #[must_use]
    pub fn is_fresh(&self, doi: &str) -> bool {
        self.is_fresh_at(doi, Local::now().naive_local())
    }

    /// [`is_fresh`](Self::is_fresh) against an explicit clock.
    #[must_use]
    pub fn is_fresh_at(&self, doi: &str, now: NaiveDateTime) -> bool {
        self.records
            .get(doi)
            .and_then(CacheRecord::checked_at)
            .is_some_and(|checked| now - checked < TimeDelta::days(CACHE_VALIDITY_DAYS))
    }

    /// Stored status, if any
    #[must_use]
    pub fn status(&self, doi: &str) -> Option<DoiStatus> {
        self.records.get(doi)?.status
    }

    /// Stored `is_valid` flag, if any
    #[must_use]
    pub fn get(&self, doi: &str) -> Option<bool> {
        self.records.get(doi).map(|r| r.is_valid)
    }

    /// `Some(true)` for Validated/Exists, `Some(false)` for NonExists.
    #[must_use]
    pub fn is_doi_valid(&self, doi: &str) -> Option<bool> {
        match self.status(doi)? {
            DoiStatus::Validated | DoiStatus::Exists => Some(true),
            DoiStatus::NonExists => Some(false),
            _ => None,
        }
    }

    /// Record `status` for `doi` with the current time and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache file cannot be written.
    pub fn set_status(&mut self, doi: &str, status: DoiStatus) -> Result<()> {
        let timestamp = Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string();
        self.insert(doi, status, timestamp);
        self.save()
    }

    pub(crate) fn insert(&mut self, doi: &str, status: DoiStatus, timestamp: String) {
        self.records.insert(
            doi.to_string(),
            CacheRecord {
                is_valid: status != DoiStatus::NonExists,
                status: Some(status),
                timestamp: Some(timestamp),
            },
        );
    }

    /// Write the cache file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, json).map_err(|e| DoiError::cache_write(&self.path, e))
    }

    /// Delete the cache file and forget all records.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| DoiError::cache_write(&self.path, e))?;
        }
        self.records.clear();
        Ok(())
    }
}
