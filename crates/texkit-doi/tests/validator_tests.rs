//! Validation runs against an in-memory resolver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use tempfile::TempDir;
use texkit_core::BibParser;
use texkit_doi::{
    DoiCache, DoiError, DoiResolver, DoiStatus, DoiValidator, Resolution, Result, TargetStatus,
    ValidatorOptions,
};

/// Canned answers keyed by DOI and landing URL; records every call.
#[derive(Default)]
struct FakeResolver {
    resolutions: HashMap<String, Resolution>,
    targets: HashMap<String, TargetStatus>,
    failing: Vec<String>,
    calls: RefCell<Vec<String>>,
}

impl FakeResolver {
    fn redirect(mut self, doi: &str, target: TargetStatus) -> Self {
        let url = format!("https://publisher.example/{doi}");
        self.resolutions
            .insert(doi.to_string(), Resolution::Redirect(url.clone()));
        self.targets.insert(url, target);
        self
    }

    fn answer(mut self, doi: &str, resolution: Resolution) -> Self {
        self.resolutions.insert(doi.to_string(), resolution);
        self
    }

    fn fail(mut self, doi: &str) -> Self {
        self.failing.push(doi.to_string());
        self
    }
}

impl DoiResolver for FakeResolver {
    fn resolve(&self, doi: &str) -> Result<Resolution> {
        self.calls.borrow_mut().push(doi.to_string());
        if self.failing.iter().any(|d| d == doi) {
            return Err(DoiError::UnexpectedStatus {
                url: format!("https://doi.org/{doi}"),
                status: 503,
            });
        }
        Ok(self
            .resolutions
            .get(doi)
            .cloned()
            .unwrap_or(Resolution::NotFound))
    }

    fn check_target(&self, url: &str) -> TargetStatus {
        self.targets
            .get(url)
            .copied()
            .unwrap_or(TargetStatus::Unreachable)
    }
}

const BIB: &str = r"@article{Confirmed1,
  doi = {10.1/ok}
}

@article{Restricted1,
  doi = {10.1/paywall}
}

@article{Gone1,
  doi = {10.1/gone}
}

@misc{NoDoi,
  title = {Nothing}
}

@article{Broken1,
  doi = {10.1/err}
}

@article{Placeholder1,
  doi = {10.1/locked}
}

@article{Odd1,
  doi = {10.1/teapot}
}

@article{Dead1,
  doi = {10.1/dead{\_}link}
}
";

fn options() -> ValidatorOptions {
    ValidatorOptions {
        limit: None,
        delay: Duration::ZERO,
    }
}

fn resolver() -> FakeResolver {
    FakeResolver::default()
        .redirect("10.1/ok", TargetStatus::Accessible)
        .redirect("10.1/paywall", TargetStatus::Restricted)
        .redirect("10.1/teapot", TargetStatus::Other(418))
        .redirect("10.1/dead_link", TargetStatus::Unreachable)
        .answer("10.1/locked", Resolution::Restricted)
        .fail("10.1/err")
}

#[test]
fn test_status_mapping_and_summary() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");
    let mut validator = DoiValidator::new(resolver(), DoiCache::open(&cache_path), options());

    let mut progress = Vec::new();
    let report = validator.validate(&BibParser::parse(BIB), |i, n, check| {
        progress.push((i, n, check.key.clone()));
    });

    let statuses: Vec<(&str, DoiStatus)> = report
        .results
        .iter()
        .map(|r| (r.key.as_str(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("Confirmed1", DoiStatus::Confirmed),
            ("Restricted1", DoiStatus::Validated),
            ("Gone1", DoiStatus::NonExists),
            ("Broken1", DoiStatus::InternalError),
            ("Placeholder1", DoiStatus::Exists),
            ("Odd1", DoiStatus::Validated),
            ("Dead1", DoiStatus::Exists),
        ]
    );

    assert_eq!(report.total_entries, 8);
    assert_eq!(report.entries_with_doi, 7);
    assert_eq!(report.non_existent_keys(), vec!["Gone1"]);
    assert_eq!(report.error_keys(), vec!["Broken1"]);
    assert!(!report.all_valid());
    assert_eq!(progress.first(), Some(&(1, 7, "Confirmed1".to_string())));
    assert_eq!(progress.len(), 7);

    // errors are not cached, everything else is
    let cache = DoiCache::open(&cache_path);
    assert_eq!(cache.len(), 6);
    assert_eq!(cache.status("10.1/gone"), Some(DoiStatus::NonExists));
    assert_eq!(cache.get("10.1/gone"), Some(false));
    assert_eq!(cache.status("10.1/dead_link"), Some(DoiStatus::Exists));
    assert!(cache.record("10.1/err").is_none());
}

#[test]
fn test_fresh_cache_skips_network() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");
    let mut cache = DoiCache::open(&cache_path);
    cache.set_status("10.1/ok", DoiStatus::Confirmed).unwrap();
    cache.set_status("10.1/gone", DoiStatus::NonExists).unwrap();

    let fake = resolver();
    let mut validator = DoiValidator::new(fake, cache, options());
    let bib = BibParser::parse("@article{A,\n  doi = {10.1/ok}\n}\n@article{B,\n  doi = {10.1/gone}\n}\n");
    let report = validator.validate(&bib, |_, _, _| {});

    assert!(report.results.iter().all(|r| r.status == DoiStatus::Cached));
    assert_eq!(report.results[1].cached_status, Some(DoiStatus::NonExists));
    assert_eq!(report.count(DoiStatus::Cached), 2);
    assert!(report.all_valid());
    assert!(validator.resolver().calls.borrow().is_empty());
}

#[test]
fn test_limit_applies_to_uncached_only() {
    let dir = TempDir::new().unwrap();
    let mut cache = DoiCache::open(dir.path().join("cache.json"));
    cache.set_status("10.1/gone", DoiStatus::NonExists).unwrap();

    let validator_options = ValidatorOptions {
        limit: Some(2),
        ..options()
    };
    let mut validator = DoiValidator::new(resolver(), cache, validator_options);
    let report = validator.validate(&BibParser::parse(BIB), |_, _, _| {});

    let checked: Vec<&str> = report.results.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(checked, vec!["Confirmed1", "Restricted1", "Gone1"]);
    assert_eq!(report.results[2].status, DoiStatus::Cached);
    assert_eq!(*validator.resolver().calls.borrow(), vec!["10.1/ok", "10.1/paywall"]);
    assert_eq!(
        report.skipped,
        vec!["Broken1", "Placeholder1", "Odd1", "Dead1"]
    );
}

#[test]
fn test_validate_file() {
    let dir = TempDir::new().unwrap();
    let bib_path = dir.path().join("references.bib");
    std::fs::write(&bib_path, BIB).unwrap();

    let mut validator =
        DoiValidator::new(resolver(), DoiCache::open(dir.path().join("c.json")), options());
    let report = validator.validate_file(&bib_path, |_, _, _| {}).unwrap();
    assert_eq!(report.count(DoiStatus::Confirmed), 1);

    let missing = validator.validate_file(&dir.path().join("nope.bib"), |_, _, _| {});
    assert!(matches!(missing, Err(DoiError::Bibliography(_))));
}
