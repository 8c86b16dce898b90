//! Batched, order-preserving geocoding.
//!
//! Addresses are split into contiguous batches. Lookups inside a batch run
//! concurrently; the next batch starts only after the whole current batch has
//! completed, so at most `batch_size` requests are ever outstanding against
//! the upstream geocoder.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info_span, warn};

use crate::error::{ListingError, Result};
use crate::listings::ResaleListing;
use crate::services::address_search::{AddressMatch, AddressSearch};

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Latitude/longitude pair; both are `None` when the address had no match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GeoCoordinate {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl GeoCoordinate {
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none()
    }
}

impl From<&AddressMatch> for GeoCoordinate {
    fn from(m: &AddressMatch) -> Self {
        Self {
            latitude: m.latitude,
            longitude: m.longitude,
        }
    }
}

/// What to do when a lookup fails at the transport level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeocodeFailurePolicy {
    /// Abort the batch and surface the error.
    #[default]
    FailFast,
    /// Log a warning and leave that address without coordinates.
    Isolate,
}

impl FromStr for GeocodeFailurePolicy {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "fail_fast" | "failfast" => Ok(Self::FailFast),
            "isolate" => Ok(Self::Isolate),
            other => Err(ListingError::Configuration(format!(
                "unknown geocode failure policy '{other}' (expected fail-fast or isolate)"
            ))),
        }
    }
}

/// Anything that carries the address to geocode.
pub trait Addressed {
    fn address(&self) -> &str;
}

impl Addressed for String {
    fn address(&self) -> &str {
        self
    }
}

impl Addressed for ResaleListing {
    fn address(&self) -> &str {
        &self.address
    }
}

/// Splits `items` into contiguous batches of at most `batch_size`.
pub fn split_batches<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        batches.push(items.by_ref().take(batch_size).collect());
    }
    batches
}

pub struct GeocodingBatcher {
    search: Arc<dyn AddressSearch>,
    batch_size: usize,
    timeout: Duration,
    policy: GeocodeFailurePolicy,
}

impl GeocodingBatcher {
    pub fn new(search: Arc<dyn AddressSearch>) -> Self {
        Self {
            search,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
            policy: GeocodeFailurePolicy::default(),
        }
    }

    /// Sets the batch size; zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: GeocodeFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Geocodes every address; `result[i]` belongs to `addresses[i]`.
    pub async fn geocode_all(&self, addresses: &[String]) -> Result<Vec<GeoCoordinate>> {
        let paired = self.geocode_paired(addresses.to_vec()).await?;
        Ok(paired.into_iter().map(|(_, coordinate)| coordinate).collect())
    }

    /// Geocodes `items` and returns each one alongside its own coordinate,
    /// in input order.
    #[tracing::instrument(skip_all, fields(items = items.len(), batch_size = self.batch_size))]
    pub async fn geocode_paired<T: Addressed>(
        &self,
        items: Vec<T>,
    ) -> Result<Vec<(T, GeoCoordinate)>> {
        let mut paired = Vec::with_capacity(items.len());
        let batches = split_batches(items, self.batch_size);
        let rounds = batches.len();

        for (round, batch) in batches.into_iter().enumerate() {
            let span = info_span!("geocode_batch", round = round + 1, rounds, size = batch.len());
            let done = self.geocode_batch(batch).instrument(span).await?;
            paired.extend(done);
        }

        let unmatched = paired.iter().filter(|(_, c)| c.is_empty()).count();
        debug!(total = paired.len(), unmatched, "Geocoding complete");
        Ok(paired)
    }

    /// Runs one lookup per item concurrently and waits for all of them.
    ///
    /// Results are collected as they complete, so under `FailFast` the first
    /// failure aborts whatever is still outstanding in the batch.
    async fn geocode_batch<T: Addressed>(&self, batch: Vec<T>) -> Result<Vec<(T, GeoCoordinate)>> {
        let mut lookups = JoinSet::new();
        for (index, item) in batch.iter().enumerate() {
            let search = Arc::clone(&self.search);
            let address = item.address().to_string();
            let timeout = self.timeout;
            lookups.spawn(
                async move {
                    let outcome = lookup(search.as_ref(), &address, timeout).await;
                    if matches!(outcome, Ok(None)) {
                        debug!(address = %address, "No geocode match");
                    }
                    let coordinate = outcome
                        .map(|best| best.as_ref().map(GeoCoordinate::from).unwrap_or_default());
                    (index, coordinate)
                }
                .in_current_span(),
            );
        }

        let mut slots: Vec<Option<GeoCoordinate>> = vec![None; batch.len()];
        while let Some(joined) = lookups.join_next().await {
            let (index, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    lookups.abort_all();
                    return Err(ListingError::TaskFailed(e));
                }
            };
            match outcome {
                Ok(coordinate) => slots[index] = Some(coordinate),
                Err(e) if self.policy == GeocodeFailurePolicy::Isolate && e.is_transport() => {
                    warn!(address = batch[index].address(), error = %e, "Geocode lookup failed, leaving coordinates empty");
                    slots[index] = Some(GeoCoordinate::default());
                }
                Err(e) => {
                    lookups.abort_all();
                    return Err(e);
                }
            }
        }

        batch
            .into_iter()
            .zip(slots)
            .map(|(item, slot)| {
                slot.map(|coordinate| (item, coordinate)).ok_or_else(|| {
                    ListingError::InvariantViolation("geocode batch finished with an unfilled slot".to_string())
                })
            })
            .collect()
    }

    /// Single lookup returning the best match, bounded by the same timeout as
    /// batched lookups.
    pub async fn search_one(&self, address: &str) -> Result<Option<AddressMatch>> {
        lookup(self.search.as_ref(), address, self.timeout).await
    }
}

async fn lookup(
    search: &dyn AddressSearch,
    address: &str,
    timeout: Duration,
) -> Result<Option<AddressMatch>> {
    let response = tokio::time::timeout(timeout, search.search(address))
        .await
        .map_err(|_| ListingError::Timeout {
            service: "geocoder",
            after: timeout,
        })??;

    Ok(response.best().cloned())
}
