//! Runtime settings read from the environment (`.env` is loaded by `main`).

use std::time::Duration;

use crate::error::{ListingError, Result};
use crate::geocode::{DEFAULT_BATCH_SIZE, GeocodeFailurePolicy};
use crate::listings::DEFAULT_LIMIT;

pub const DEFAULT_DATAGOV_BASE_URL: &str = "https://data.gov.sg";
/// HDB resale flat prices, January 2017 onwards.
pub const DEFAULT_DATASET_ID: &str = "d_8b84c4ee58e3cfc0ece0d773c8ca6abc";
pub const DEFAULT_ONEMAP_BASE_URL: &str = "https://www.onemap.gov.sg";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub datagov_base_url: String,
    pub dataset_id: String,
    pub datagov_api_key: Option<String>,
    pub onemap_base_url: String,
    pub batch_size: usize,
    pub failure_policy: GeocodeFailurePolicy,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub listing_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            datagov_base_url: DEFAULT_DATAGOV_BASE_URL.to_string(),
            dataset_id: DEFAULT_DATASET_ID.to_string(),
            datagov_api_key: None,
            onemap_base_url: DEFAULT_ONEMAP_BASE_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            failure_policy: GeocodeFailurePolicy::FailFast,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            listing_limit: DEFAULT_LIMIT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; unset or blank keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let settings = Settings {
            datagov_base_url: get("DATAGOV_BASE_URL").unwrap_or(defaults.datagov_base_url),
            dataset_id: get("DATAGOV_DATASET_ID").unwrap_or(defaults.dataset_id),
            datagov_api_key: get("DATAGOV_API_KEY"),
            onemap_base_url: get("ONEMAP_BASE_URL").unwrap_or(defaults.onemap_base_url),
            batch_size: parse_or("GEOCODE_BATCH_SIZE", get("GEOCODE_BATCH_SIZE"), defaults.batch_size)?,
            failure_policy: match get("GEOCODE_FAILURE_POLICY") {
                Some(v) => v.parse()?,
                None => defaults.failure_policy,
            },
            request_timeout: parse_or("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), 30)
                .map(Duration::from_secs)?,
            connect_timeout: parse_or("HTTP_CONNECT_TIMEOUT_SECS", get("HTTP_CONNECT_TIMEOUT_SECS"), 10)
                .map(Duration::from_secs)?,
            listing_limit: parse_or("LISTING_LIMIT", get("LISTING_LIMIT"), defaults.listing_limit)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ListingError::Configuration(
                "GEOCODE_BATCH_SIZE must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ListingError::Configuration(
                "HTTP_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ListingError::Configuration(
                "HTTP_CONNECT_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        if self.listing_limit == 0 {
            return Err(ListingError::Configuration(
                "LISTING_LIMIT must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ListingError::Configuration(format!("{key} has invalid value '{v}'"))),
    }
}
