//! Validation runs over a bibliography.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use texkit_core::{BibParser, Bibliography};

use crate::cache::DoiCache;
use crate::error::Result;
use crate::resolver::{DoiResolver, Resolution, TargetStatus};
use crate::status::DoiStatus;

/// Pause between two uncached checks.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// An entry carrying a DOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoiEntry {
    pub key: String,
    pub doi: String,
}

/// Undo BibTeX escaping in a DOI: `{\_}`, `{_}` and `\_` become `_`, other
/// braces are dropped.
#[must_use]
pub fn clean_doi(raw: &str) -> String {
    raw.trim()
        .replace(r"{\_}", "_")
        .replace("{_}", "_")
        .replace(r"\_", "_")
        .replace(['{', '}'], "")
}

/// Every entry with a non-empty `doi` field, in file order.
#[must_use]
pub fn extract_dois(bibliography: &Bibliography) -> Vec<DoiEntry> {
    bibliography
        .iter()
        .filter_map(|entry| {
            let doi = clean_doi(entry.get("doi")?);
            (!doi.is_empty()).then(|| DoiEntry {
                key: entry.key().to_string(),
                doi,
            })
        })
        .collect()
}

/// Run settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Check at most this many uncached DOIs; the rest are skipped
    pub limit: Option<usize>,
    /// Pause after each uncached check
    pub delay: Duration,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            limit: None,
            delay: DEFAULT_DELAY,
        }
    }
}

/// Outcome for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoiCheck {
    pub key: String,
    pub doi: String,
    pub status: DoiStatus,
    /// Status stored in the cache when `status` is `Cached`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_status: Option<DoiStatus>,
}

/// Results of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Entries in the bibliography, with or without DOI
    pub total_entries: usize,
    pub entries_with_doi: usize,
    pub results: Vec<DoiCheck>,
    /// Keys not checked because the limit was reached
    pub skipped: Vec<String>,
}

impl ValidationReport {
    #[must_use]
    pub fn count(&self, status: DoiStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Count per status, every status present
    #[must_use]
    pub fn counts(&self) -> BTreeMap<DoiStatus, usize> {
        DoiStatus::ALL
            .into_iter()
            .map(|status| (status, self.count(status)))
            .collect()
    }

    /// Sorted keys whose DOI does not exist
    #[must_use]
    pub fn non_existent_keys(&self) -> Vec<&str> {
        self.sorted_keys(DoiStatus::NonExists)
    }

    /// Sorted keys whose check failed
    #[must_use]
    pub fn error_keys(&self) -> Vec<&str> {
        self.sorted_keys(DoiStatus::InternalError)
    }

    /// True when nothing was non-existent or failed
    #[must_use]
    pub fn all_valid(&self) -> bool {
        self.count(DoiStatus::NonExists) == 0 && self.count(DoiStatus::InternalError) == 0
    }

    fn sorted_keys(&self, status: DoiStatus) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .results
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }
}

/// Checks DOIs through a resolver, consulting and updating a cache.
#[derive(Debug)]
pub struct DoiValidator<R> {
    resolver: R,
    cache: DoiCache,
    options: ValidatorOptions,
}

impl<R: DoiResolver> DoiValidator<R> {
    pub fn new(resolver: R, cache: DoiCache, options: ValidatorOptions) -> Self {
        Self {
            resolver,
            cache,
            options,
        }
    }

    #[must_use]
    pub const fn resolver(&self) -> &R {
        &self.resolver
    }

    #[must_use]
    pub const fn cache(&self) -> &DoiCache {
        &self.cache
    }

    /// Load `path` and validate every DOI in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the bibliography cannot be read.
    pub fn validate_file(
        &mut self,
        path: &Path,
        on_result: impl FnMut(usize, usize, &DoiCheck),
    ) -> Result<ValidationReport> {
        log::info!("Loading BibTeX file: {}", path.display());
        let bibliography = BibParser::parse_file(path)?;
        Ok(self.validate(&bibliography, on_result))
    }

    /// Validate every DOI in `bibliography`.
    ///
    /// `on_result` is called after each entry with its 1-based position,
    /// the number of DOI entries, and the outcome.
    pub fn validate(
        &mut self,
        bibliography: &Bibliography,
        mut on_result: impl FnMut(usize, usize, &DoiCheck),
    ) -> ValidationReport {
        let entries = extract_dois(bibliography);
        let total = entries.len();
        let mut report = ValidationReport {
            total_entries: bibliography.len(),
            entries_with_doi: total,
            ..ValidationReport::default()
        };
        log::info!("Found {total} entries with DOI in bibliography");

        let mut uncached = 0usize;
        for (i, DoiEntry { key, doi }) in entries.into_iter().enumerate() {
            let position = i + 1;
            let check = if self.cache.is_fresh(&doi) {
                let cached_status = self.cache.status(&doi);
                log::debug!("Using cached result for {doi}: {cached_status:?}");
                DoiCheck {
                    key,
                    doi,
                    status: DoiStatus::Cached,
                    cached_status,
                }
            } else {
                uncached += 1;
                if self.options.limit.is_some_and(|limit| uncached > limit) {
                    log::debug!("[{position}/{total}] {key} skipped (limit reached, no cache)");
                    report.skipped.push(key);
                    continue;
                }
                let status = self.check(&doi, &key);
                DoiCheck {
                    key,
                    doi,
                    status,
                    cached_status: None,
                }
            };

            on_result(position, total, &check);
            let external = check.status != DoiStatus::Cached;
            report.results.push(check);

            if external && position < total && !self.options.delay.is_zero() {
                std::thread::sleep(self.options.delay);
            }
        }

        report
    }

    /// Resolve one DOI and cache the outcome unless it failed.
    pub fn check(&mut self, doi: &str, key: &str) -> DoiStatus {
        let status = match self.resolver.resolve(doi) {
            Ok(Resolution::NotFound) => DoiStatus::NonExists,
            Ok(Resolution::Restricted) => DoiStatus::Exists,
            Ok(Resolution::Redirect(target)) => {
                log::debug!("DOI redirects to: {target}");
                match self.resolver.check_target(&target) {
                    TargetStatus::Accessible => DoiStatus::Confirmed,
                    TargetStatus::Restricted | TargetStatus::Other(_) => DoiStatus::Validated,
                    TargetStatus::Unreachable => DoiStatus::Exists,
                }
            }
            Err(e) => {
                log::warn!("Could not check {key}: {e}");
                return DoiStatus::InternalError;
            }
        };

        if let Err(e) = self.cache.set_status(doi, status) {
            log::warn!("Could not save cache: {e}");
        }
        status
    }
}
