//! DOI resolution over HTTP.
//!
//! A DOI is checked in two steps. The resolver URL is requested without
//! following redirects: a redirect means the DOI is registered. The redirect
//! target is then requested normally to see whether the landing page answers.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::StatusCode;

use crate::error::{DoiError, Result};

/// Resolver base URL.
pub const DOI_BASE_URL: &str = "https://doi.org/";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Browser user agent; several publishers refuse unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// What the DOI resolver said about a DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Registered; redirects to the given landing page
    Redirect(String),
    /// Registered, but the resolver answered 401/403
    Restricted,
    /// Not registered
    NotFound,
}

/// What a landing page answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    /// HTTP 2xx
    Accessible,
    /// HTTP 401/403
    Restricted,
    /// HTTP 404 or no answer
    Unreachable,
    /// Any other HTTP status
    Other(u16),
}

/// Source of DOI resolution answers.
pub trait DoiResolver {
    /// Ask the resolver about `doi` without following redirects.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or an uninformative status.
    fn resolve(&self, doi: &str) -> Result<Resolution>;

    /// Request a landing page, following redirects.
    fn check_target(&self, url: &str) -> TargetStatus;
}

/// Full resolver URL for `doi`
#[must_use]
pub fn doi_url(doi: &str) -> String {
    format!("{DOI_BASE_URL}{doi}")
}

/// Blocking `reqwest` implementation of [`DoiResolver`].
#[derive(Debug, Clone)]
pub struct HttpResolver {
    no_redirect: Client,
    follow: Client,
}

impl HttpResolver {
    /// Build clients with the given timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be built.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let no_redirect = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(Policy::none())
            .build()?;
        let follow = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            no_redirect,
            follow,
        })
    }
}

impl DoiResolver for HttpResolver {
    fn resolve(&self, doi: &str) -> Result<Resolution> {
        let url = doi_url(doi);
        let response = self.no_redirect.get(&url).send().map_err(|e| {
            log::warn!("Connection error for {url}: {e}");
            DoiError::Http(e)
        })?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            log::debug!("HTTP {} redirect to: {location:?}", status.as_u16());
            return Ok(location.map_or(Resolution::NotFound, Resolution::Redirect));
        }
        if status == StatusCode::NOT_FOUND || status.is_success() {
            return Ok(Resolution::NotFound);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            log::debug!("HTTP {} (access restricted but DOI likely exists)", status.as_u16());
            return Ok(Resolution::Restricted);
        }

        log::warn!("HTTP {} checking redirect for {url}", status.as_u16());
        Err(DoiError::UnexpectedStatus {
            url,
            status: status.as_u16(),
        })
    }

    fn check_target(&self, url: &str) -> TargetStatus {
        match self.follow.get(url).send() {
            Ok(response) => {
                let status = response.status();
                match status {
                    s if s.is_success() => TargetStatus::Accessible,
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TargetStatus::Restricted,
                    StatusCode::NOT_FOUND => TargetStatus::Unreachable,
                    s => TargetStatus::Other(s.as_u16()),
                }
            }
            Err(e) => {
                log::debug!("Connection error validating redirect target {url}: {e}");
                TargetStatus::Unreachable
            }
        }
    }
}
