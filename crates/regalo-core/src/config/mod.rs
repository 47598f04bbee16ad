//! Runtime configuration for sites and the reservation backend.
//!
//! The site definition (event details, gift catalog, bank accounts) is read
//! from a JSON file. The backend is optional: when neither the Supabase URL
//! nor the anon key is set, the store runs in local-only mode.

use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::SiteConfig;
use crate::util::{has_http_scheme, non_blank};

pub const DEFAULT_TABLE: &str = "reservations";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Connection settings for the hosted reservations table.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project URL without the `/rest/v1` suffix
    pub url: String,
    pub anon_key: String,
    pub table: String,
    /// Upper bound for each remote call
    pub request_timeout: Duration,
    /// Change feed polling period
    pub poll_interval: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field("table", &self.table)
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl BackendConfig {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> Result<Self> {
        let url = normalize_backend_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::Config(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            url,
            anon_key,
            table: DEFAULT_TABLE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        })
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// PostgREST endpoint for the configured table.
    pub fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, urlencoding::encode(&self.table))
    }
}

/// Raw, possibly partial backend settings (from env vars or CLI flags).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub table: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
}

impl BackendSettings {
    /// Read settings from the process environment.
    ///
    /// `SUPABASE_URL`/`SUPABASE_ANON_KEY` win over the `VITE_`-prefixed names
    /// that existing site deployments already define.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            url: non_blank(var("SUPABASE_URL"))
                .or_else(|| non_blank(var("VITE_SUPABASE_URL"))),
            anon_key: non_blank(var("SUPABASE_ANON_KEY"))
                .or_else(|| non_blank(var("VITE_SUPABASE_ANON_KEY"))),
            table: non_blank(var("REGALO_TABLE")),
            request_timeout_secs: var("REGALO_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()),
            poll_interval_secs: var("REGALO_POLL_SECS").and_then(|v| v.trim().parse().ok()),
        }
    }

    /// Resolve into a backend config, or `None` for local-only mode.
    ///
    /// Both URL and key are required; when either is missing the store
    /// falls back to local-only mode.
    pub fn resolve(self) -> Result<Option<BackendConfig>> {
        let url = non_blank(self.url);
        let anon_key = non_blank(self.anon_key);

        let (url, anon_key) = match (url, anon_key) {
            (Some(url), Some(anon_key)) => (url, anon_key),
            (None, None) => return Ok(None),
            (Some(_), None) => {
                tracing::warn!(
                    "SUPABASE_URL is set but SUPABASE_ANON_KEY is missing; reservations stay local"
                );
                return Ok(None);
            }
            (None, Some(_)) => {
                tracing::warn!(
                    "SUPABASE_ANON_KEY is set but SUPABASE_URL is missing; reservations stay local"
                );
                return Ok(None);
            }
        };

        let mut config = BackendConfig::new(url, anon_key)?;
        if let Some(table) = non_blank(self.table) {
            config = config.with_table(table);
        }
        if let Some(secs) = self.request_timeout_secs.filter(|secs| *secs > 0) {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.poll_interval_secs.filter(|secs| *secs > 0) {
            config = config.with_poll_interval(Duration::from_secs(secs));
        }
        Ok(Some(config))
    }
}

/// Parse and validate a site definition from a raw JSON payload.
pub fn parse_site_config(payload: &str) -> Result<SiteConfig> {
    let site: SiteConfig = serde_json::from_str(payload)?;
    if site.couple_names.trim().is_empty() {
        return Err(Error::Config("couple_names must not be empty".to_string()));
    }
    if !has_http_scheme(site.maps_url.trim()) {
        return Err(Error::Config(
            "maps_url must include http:// or https://".to_string(),
        ));
    }
    if let Some(rsvp_url) = site.rsvp_url.as_deref() {
        if !has_http_scheme(rsvp_url.trim()) {
            return Err(Error::Config(
                "rsvp_url must include http:// or https://".to_string(),
            ));
        }
    }
    site.catalog()?;
    Ok(site)
}

/// Load and validate a site definition file.
pub fn load_site_config(path: &Path) -> Result<SiteConfig> {
    let raw = std::fs::read_to_string(path).map_err(|error| {
        Error::Config(format!(
            "Failed to read site config at {}: {}",
            path.display(),
            error
        ))
    })?;
    parse_site_config(&raw).map_err(|error| {
        Error::Config(format!(
            "Invalid site config at {}: {}",
            path.display(),
            error
        ))
    })
}

fn normalize_backend_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Config("Supabase URL must not be empty".to_string()));
    }
    if !has_http_scheme(trimmed) {
        return Err(Error::Config(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    Ok(trimmed
        .strip_suffix("/rest/v1")
        .unwrap_or(trimmed)
        .to_string())
}
