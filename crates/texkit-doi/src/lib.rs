//! # texkit-doi
//!
//! Checks that the DOIs in a BibTeX database are registered.
//!
//! Each DOI is looked up at `https://doi.org/` without following the
//! redirect; a redirect proves registration, and the landing page is then
//! fetched to grade how reachable it is. Results are cached in
//! `~/.bib_validator` for 30 days.
//!
//! ## Statuses
//!
//! | Symbol | Status | Meaning |
//! |--------|--------|---------|
//! | ✔️ | `Exists` | Registered, landing page unreachable |
//! | 🔗 | `Validated` | Registered, landing page restricted (401/403) |
//! | ✅ | `Confirmed` | Registered, landing page answers 200 |
//! | 💾 | `Cached` | Fresh cached result |
//! | ❌ | `NonExists` | Not registered |
//! | ⚠️ | `Internal_Error` | Connection or unexpected HTTP error |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use texkit_doi::{DoiCache, DoiValidator, HttpResolver, ValidatorOptions};
//!
//! let resolver = HttpResolver::new(Duration::from_secs(5), texkit_doi::DEFAULT_USER_AGENT)?;
//! let cache = DoiCache::open("/tmp/doi-cache.json");
//! let mut validator = DoiValidator::new(resolver, cache, ValidatorOptions::default());
//!
//! let report = validator.validate_file(Path::new("references.bib"), |i, n, check| {
//!     println!("[{i}/{n}] {} {}", check.status.symbol(), check.key);
//! })?;
//! println!("Non-existent: {:?}", report.non_existent_keys());
//! # Ok::<(), texkit_doi::DoiError>(())
//! ```

pub mod cache;
pub mod error;
pub mod resolver;
pub mod status;
pub mod validator;

pub use cache::{CacheRecord, DoiCache, CACHE_VALIDITY_DAYS};
pub use error::{DoiError, Result};
pub use resolver::{
    doi_url, DoiResolver, HttpResolver, Resolution, TargetStatus, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
pub use status::DoiStatus;
pub use validator::{
    clean_doi, extract_dois, DoiCheck, DoiEntry, DoiValidator, ValidationReport, ValidatorOptions,
};
