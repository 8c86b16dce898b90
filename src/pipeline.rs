//! Fetch → geocode → classify orchestration.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::affordability::{Tier, classify};
use crate::error::{ListingError, Result};
use crate::geocode::{GeoCoordinate, GeocodingBatcher};
use crate::listings::{ListingDetails, ListingFetcher, ResaleListing, SearchCriteria, candidate_windows};

/// A listing with its coordinates and affordability tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedListing {
    #[serde(flatten)]
    pub listing: ResaleListing,
    #[serde(flatten)]
    pub coordinates: GeoCoordinate,
    pub tier: Tier,
    pub color: &'static str,
}

/// Tier counts for one aggregation run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TierSummary {
    pub total: usize,
    pub located: usize,
    pub by_tier: BTreeMap<&'static str, usize>,
}

impl TierSummary {
    pub fn from_listings(listings: &[EnrichedListing]) -> Self {
        let mut summary = TierSummary {
            total: listings.len(),
            ..Default::default()
        };
        for l in listings {
            if !l.coordinates.is_empty() {
                summary.located += 1;
            }
            *summary.by_tier.entry(l.tier.as_str()).or_default() += 1;
        }
        summary
    }

    pub fn count(&self, tier: Tier) -> usize {
        self.by_tier.get(tier.as_str()).copied().unwrap_or(0)
    }
}

pub struct AggregationPipeline {
    fetcher: ListingFetcher,
    geocoder: GeocodingBatcher,
}

impl AggregationPipeline {
    pub fn new(fetcher: ListingFetcher, geocoder: GeocodingBatcher) -> Self {
        Self { fetcher, geocoder }
    }

    /// Runs a search using today's local date to pick the month windows.
    pub async fn aggregate(&self, criteria: &SearchCriteria) -> Result<Vec<EnrichedListing>> {
        self.aggregate_on(criteria, Local::now().date_naive()).await
    }

    /// Runs a search as of `today`.
    ///
    /// Returns listings in dataset order. Nothing is returned if any stage
    /// fails.
    #[tracing::instrument(skip(self, criteria, today), fields(area = %criteria.area, today = %today))]
    pub async fn aggregate_on(
        &self,
        criteria: &SearchCriteria,
        today: NaiveDate,
    ) -> Result<Vec<EnrichedListing>> {
        let rows = self
            .fetcher
            .fetch_windows(criteria, &candidate_windows(today))
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let located = self.geocoder.geocode_paired(rows).await?;

        let enriched: Vec<EnrichedListing> = located
            .into_iter()
            .map(|(listing, coordinates)| {
                let tier = classify(
                    criteria.preferred_price,
                    listing.resale_price,
                    criteria.salary,
                    &criteria.flat_type,
                    criteria.cpf_balance,
                );
                EnrichedListing {
                    listing,
                    coordinates,
                    tier,
                    color: tier.color(),
                }
            })
            .collect();

        let summary = TierSummary::from_listings(&enriched);
        info!(
            total = summary.total,
            located = summary.located,
            green = summary.count(Tier::Green),
            yellow = summary.count(Tier::Yellow),
            red = summary.count(Tier::Red),
            unknown = summary.count(Tier::Unknown),
            "Aggregation complete"
        );

        Ok(enriched)
    }

    /// Looks up one transaction and attaches its postal code.
    #[tracing::instrument(skip(self))]
    pub async fn details(&self, block: &str, street_name: &str, month: &str) -> Result<ListingDetails> {
        let listing = self
            .fetcher
            .fetch_one(block, street_name, month)
            .await?
            .ok_or_else(|| ListingError::ListingNotFound {
                block: block.to_string(),
                street: street_name.to_string(),
                month: month.to_string(),
            })?;

        let address = ResaleListing::derive_address(block, street_name);
        let postal_code = self
            .geocoder
            .search_one(&address)
            .await?
            .and_then(|m| m.postal_code);

        Ok(ListingDetails {
            month: listing.month,
            flat_type: listing.flat_type,
            storey_range: listing.storey_range,
            floor_area_sqm: listing.floor_area_sqm,
            flat_model: listing.flat_model,
            remaining_lease: listing.remaining_lease,
            resale_price: listing.resale_price,
            postal_code,
        })
    }
}
