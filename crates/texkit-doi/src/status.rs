//! DOI validation outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of checking one DOI.
///
/// | Status | Meaning |
/// |--------|---------|
/// | `Exists` | DOI redirects, target unreachable or unverifiable |
/// | `Validated` | DOI redirects, target restricted (HTTP 401/403) |
/// | `Confirmed` | DOI redirects, target answers HTTP 200 |
/// | `Cached` | Fresh cached result, no request made |
/// | `NonExists` | Resolver does not know the DOI |
/// | `InternalError` | Network or unexpected HTTP failure |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DoiStatus {
    Exists,
    Validated,
    Confirmed,
    Cached,
    NonExists,
    #[serde(rename = "Internal_Error")]
    InternalError,
}

impl DoiStatus {
    /// Every status, in report order
    pub const ALL: [Self; 6] = [
        Self::Exists,
        Self::Validated,
        Self::Confirmed,
        Self::Cached,
        Self::NonExists,
        Self::InternalError,
    ];

    /// Terminal symbol shown next to an entry.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Exists => "✔️",
            Self::Validated => "🔗",
            Self::Confirmed => "✅",
            Self::Cached => "💾",
            Self::NonExists => "❌",
            Self::InternalError => "⚠️",
        }
    }

    /// Name as stored in the cache file
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exists => "Exists",
            Self::Validated => "Validated",
            Self::Confirmed => "Confirmed",
            Self::Cached => "Cached",
            Self::NonExists => "NonExists",
            Self::InternalError => "Internal_Error",
        }
    }
}

impl fmt::Display for DoiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
