use std::sync::Arc;

use chrono::Local;
use serde_json::Value;
use tracing::{debug, info};

use super::types::{ResaleListing, SearchCriteria};
use super::window::{MonthWindow, candidate_windows};
use crate::error::{ListingError, Result};
use crate::services::resale_dataset::{DatasetRow, QueryFilters, ResaleDataset};

/// Row cap for a single dataset query. Results beyond it are not fetched.
pub const DEFAULT_LIMIT: usize = 200;

/// Queries the resale dataset for listings matching a [`SearchCriteria`].
pub struct ListingFetcher {
    dataset: Arc<dyn ResaleDataset>,
    limit: usize,
}

impl ListingFetcher {
    pub fn new(dataset: Arc<dyn ResaleDataset>, limit: usize) -> Self {
        Self { dataset, limit }
    }

    /// Builds the dataset filters for one month window.
    pub fn filters_for(criteria: &SearchCriteria, window: MonthWindow) -> QueryFilters {
        let mut filters = QueryFilters::new().ilike("month", window.label());

        let area = criteria.normalized_area();
        if !area.is_empty() {
            filters = filters.ilike("town", area);
        }

        if criteria.has_affordability_profile() {
            filters = filters.ilike("flat_type", criteria.normalized_hdb_category());
        }

        filters
    }

    /// Fetches listings for the current month, falling back to the previous
    /// month when the current one has no transactions yet.
    pub async fn fetch(&self, criteria: &SearchCriteria) -> Result<Vec<ResaleListing>> {
        let windows = candidate_windows(Local::now().date_naive());
        self.fetch_windows(criteria, &windows).await
    }

    /// Tries each window in order and returns the first non-empty result.
    ///
    /// An empty vector means no window had matching rows.
    #[tracing::instrument(skip(self, windows), fields(area = %criteria.area, windows = windows.len()))]
    pub async fn fetch_windows(
        &self,
        criteria: &SearchCriteria,
        windows: &[MonthWindow],
    ) -> Result<Vec<ResaleListing>> {
        for window in windows {
            let filters = Self::filters_for(criteria, *window);
            let rows = self.dataset.query(&filters, self.limit).await?;

            if rows.is_empty() {
                debug!(month = %window, "No listings in window");
                continue;
            }

            info!(month = %window, rows = rows.len(), "Listings fetched");
            return rows.into_iter().map(normalize).collect();
        }

        info!("No listings in any window");
        Ok(Vec::new())
    }

    /// Looks up a single transaction by block, street and month.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_one(
        &self,
        block: &str,
        street_name: &str,
        month: &str,
    ) -> Result<Option<ResaleListing>> {
        let filters = QueryFilters::new()
            .ilike("block", block)
            .ilike("street_name", street_name)
            .ilike("month", month);

        let rows = self.dataset.query(&filters, 1).await?;
        rows.into_iter().next().map(normalize).transpose()
    }
}

/// Derives the address and parses the price of one dataset row.
///
/// A price that is not a number fails the whole fetch: a corrupt row is not
/// silently dropped.
fn normalize(row: DatasetRow) -> Result<ResaleListing> {
    let address = ResaleListing::derive_address(&row.block, &row.street_name);
    let resale_price = parse_price(&row.resale_price, &address)?;

    Ok(ResaleListing {
        month: row.month,
        town: row.town,
        block: row.block,
        street_name: row.street_name,
        address,
        flat_type: row.flat_type,
        floor_area_sqm: row.floor_area_sqm,
        resale_price,
        remaining_lease: row.remaining_lease,
        storey_range: row.storey_range,
        flat_model: row.flat_model,
        lease_commence_date: row.lease_commence_date,
    })
}

fn parse_price(value: &Value, record: &str) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|p| p.is_finite())
        .ok_or_else(|| ListingError::MalformedData {
            record: record.to_string(),
            field: "resale_price",
            value: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves rows per month and records every filter set it receives.
    #[derive(Default)]
    struct MonthlyDataset {
        rows: Vec<(String, DatasetRow)>,
        seen: Mutex<Vec<QueryFilters>>,
    }

    #[async_trait]
    impl ResaleDataset for MonthlyDataset {
        async fn query(&self, filters: &QueryFilters, limit: usize) -> Result<Vec<DatasetRow>> {
            self.seen.lock().unwrap().push(filters.clone());
            let month = filters.get("month").map(|f| f.value.clone()).unwrap_or_default();
            Ok(self
                .rows
                .iter()
                .filter(|(m, _)| *m == month)
                .map(|(_, r)| r.clone())
                .take(limit)
                .collect())
        }
    }

    fn row(month: &str, block: &str, price: Value) -> (String, DatasetRow) {
        (
            month.to_string(),
            DatasetRow {
                month: month.to_string(),
                town: "BEDOK".to_string(),
                flat_type: "4 ROOM".to_string(),
                block: block.to_string(),
                street_name: "BEDOK NTH AVE 4".to_string(),
                resale_price: price,
                ..Default::default()
            },
        )
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            area: "Bedok".to_string(),
            preferred_price: 450000.0,
            salary: 5000.0,
            flat_type: "4-Room".to_string(),
            cpf_balance: 20000.0,
            hdb_category: "4-room".to_string(),
        }
    }

    fn windows() -> Vec<MonthWindow> {
        candidate_windows(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
    }

    #[tokio::test]
    async fn test_current_month_wins() {
        let dataset = Arc::new(MonthlyDataset {
            rows: vec![
                row("2024-06", "101", json!("455000")),
                row("2024-05", "102", json!("430000")),
            ],
            ..Default::default()
        });
        let fetcher = ListingFetcher::new(dataset.clone(), DEFAULT_LIMIT);

        let listings = fetcher.fetch_windows(&criteria(), &windows()).await.unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].block, "101");
        assert_eq!(dataset.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_previous_month() {
        let dataset = Arc::new(MonthlyDataset {
            rows: vec![
                row("2024-05", "102", json!("430000")),
                row("2024-05", "103", json!(440000)),
            ],
            ..Default::default()
        });
        let fetcher = ListingFetcher::new(dataset.clone(), DEFAULT_LIMIT);

        let listings = fetcher.fetch_windows(&criteria(), &windows()).await.unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].address, "102 BEDOK NTH AVE 4");
        assert_eq!(listings[1].resale_price, 440000.0);
        assert_eq!(dataset.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_in_both_months_is_not_an_error() {
        let dataset = Arc::new(MonthlyDataset::default());
        let fetcher = ListingFetcher::new(dataset, DEFAULT_LIMIT);

        let listings = fetcher.fetch_windows(&criteria(), &windows()).await.unwrap();
        assert!(listings.is_empty());
    }

    #[tokio::test]
    async fn test_non_numeric_price_fails_fetch() {
        let dataset = Arc::new(MonthlyDataset {
            rows: vec![
                row("2024-06", "101", json!("455000")),
                row("2024-06", "102", json!("n/a")),
            ],
            ..Default::default()
        });
        let fetcher = ListingFetcher::new(dataset, DEFAULT_LIMIT);

        let err = fetcher
            .fetch_windows(&criteria(), &windows())
            .await
            .unwrap_err();
        match err {
            ListingError::MalformedData { record, value, .. } => {
                assert_eq!(record, "102 BEDOK NTH AVE 4");
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_limit_is_passed_through() {
        let dataset = Arc::new(MonthlyDataset {
            rows: (0..5)
                .map(|i| row("2024-06", &i.to_string(), json!("400000")))
                .collect(),
            ..Default::default()
        });
        let fetcher = ListingFetcher::new(dataset, 3);

        let listings = fetcher.fetch_windows(&criteria(), &windows()).await.unwrap();
        assert_eq!(listings.len(), 3);
    }

    #[test]
    fn test_filters_with_full_profile() {
        let filters = ListingFetcher::filters_for(&criteria(), windows()[0]);
        assert_eq!(filters.get("town").unwrap().value, "BEDOK");
        assert_eq!(filters.get("month").unwrap().value, "2024-06");
        assert_eq!(filters.get("flat_type").unwrap().value, "4 ROOM");
    }

    #[test]
    fn test_filters_skip_category_without_profile() {
        let mut c = criteria();
        c.salary = 0.0;
        c.area = String::new();
        let filters = ListingFetcher::filters_for(&c, windows()[1]);
        assert_eq!(filters.len(), 1);
        assert_eq!(filters.get("month").unwrap().value, "2024-05");
    }

    #[tokio::test]
    async fn test_fetch_one_uses_exact_filters() {
        let dataset = Arc::new(MonthlyDataset {
            rows: vec![row("2024-05", "102", json!("430000"))],
            ..Default::default()
        });
        let fetcher = ListingFetcher::new(dataset.clone(), DEFAULT_LIMIT);

        let listing = fetcher
            .fetch_one("102", "BEDOK NTH AVE 4", "2024-05")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.resale_price, 430000.0);

        let seen = dataset.seen.lock().unwrap();
        assert_eq!(seen[0].get("block").unwrap().value, "102");
        assert_eq!(seen[0].get("street_name").unwrap().value, "BEDOK NTH AVE 4");
    }

    #[test]
    fn test_parse_price_rejects_nan_and_null() {
        assert!(parse_price(&json!("NaN"), "x").is_err());
        assert!(parse_price(&Value::Null, "x").is_err());
        assert_eq!(parse_price(&json!(" 380000.0 "), "x").unwrap(), 380000.0);
    }
}
