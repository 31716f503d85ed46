//! Sync client configuration.
//!
//! Settings come from an environment-style lookup so front-ends can layer
//! their own sources (config files, flags) underneath the process env.

use std::time::Duration;

use crate::sync::BackoffPolicy;
use crate::{Error, Result};

pub const ENV_SYNC_URL: &str = "DITTO_SYNC_URL";
pub const ENV_SYNC_TIMEOUT_SECS: &str = "DITTO_SYNC_TIMEOUT_SECS";
pub const ENV_BACKOFF_BASE_MS: &str = "DITTO_SYNC_BACKOFF_BASE_MS";
pub const ENV_BACKOFF_MAX_MS: &str = "DITTO_SYNC_BACKOFF_MAX_MS";

/// Default bound on a single sync request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(300);

/// Where and how the sync engine talks to the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Bulk sync endpoint (`POST`)
    pub endpoint: String,
    /// Bound on one request, including connect and body transfer
    pub request_timeout: Duration,
    /// Optional retry backoff after failed cycles; `None` retries on every trigger
    pub backoff: Option<BackoffPolicy>,
}

impl SyncSettings {
    /// Validate `endpoint` and build settings with default timeout and no backoff.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            endpoint: normalize_endpoint(endpoint.into())?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backoff: None,
        })
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::Config("request timeout must be positive".into()));
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    /// Enable exponential backoff between failed cycles
    #[must_use]
    pub const fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = Some(policy);
        self
    }

    /// Read settings through `lookup`, using the `DITTO_SYNC_*` variable names.
    ///
    /// Returns `Ok(None)` when no endpoint is configured.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(endpoint) = non_blank(lookup(ENV_SYNC_URL)) else {
            return Ok(None);
        };
        let mut settings = Self::new(endpoint)?;

        if let Some(secs) = parse_u64(&lookup, ENV_SYNC_TIMEOUT_SECS)? {
            settings = settings.with_timeout(Duration::from_secs(secs))?;
        }

        if let Some(base_ms) = parse_u64(&lookup, ENV_BACKOFF_BASE_MS)? {
            let max = parse_u64(&lookup, ENV_BACKOFF_MAX_MS)?
                .map_or(DEFAULT_BACKOFF_MAX, Duration::from_millis);
            settings = settings.with_backoff(BackoffPolicy::new(Duration::from_millis(base_ms), max)?);
        }

        Ok(Some(settings))
    }
}

/// Trim an endpoint URL, require an http(s) scheme and drop trailing slashes.
pub fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = non_blank(Some(raw))
        .ok_or_else(|| Error::Config("sync endpoint must not be empty".into()))?;
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "sync endpoint must include http:// or https://".into(),
        ))
    }
}

/// Trimmed value, or `None` when missing or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    non_blank(lookup(name))
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("{name} must be a non-negative integer")))
        })
        .transpose()
}
