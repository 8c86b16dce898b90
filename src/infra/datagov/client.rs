use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ListingError, Result};
use crate::fetch::{HttpClient, fetch_json};
use crate::services::resale_dataset::{DatasetRow, QueryFilters, ResaleDataset};

const SERVICE: &str = "data.gov.sg";

#[derive(Deserialize)]
struct Envelope {
    #[serde(default = "default_success")]
    success: bool,
    result: Option<SearchResult>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

fn default_success() -> bool {
    true
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    records: Vec<DatasetRow>,
}

/// `datastore_search` client for one data.gov.sg resource.
pub struct DataGovClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    dataset_id: String,
}

impl DataGovClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str, dataset_id: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            dataset_id: dataset_id.to_string(),
        }
    }

    fn search_url(&self, filters: &QueryFilters, limit: usize) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/api/action/datastore_search", self.base_url))
            .map_err(|e| ListingError::Configuration(format!("invalid data.gov.sg URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("resource_id", &self.dataset_id);
            if !filters.is_empty() {
                query.append_pair("filters", &filters.to_json());
            }
            query.append_pair("limit", &limit.to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl ResaleDataset for DataGovClient {
    #[tracing::instrument(skip(self), fields(dataset = %self.dataset_id))]
    async fn query(&self, filters: &QueryFilters, limit: usize) -> Result<Vec<DatasetRow>> {
        let url = self.search_url(filters, limit)?;
        let envelope: Envelope = fetch_json(self.http.as_ref(), SERVICE, url).await?;

        if !envelope.success {
            let details = envelope
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "success=false".to_string());
            return Err(ListingError::Decode {
                service: SERVICE,
                details,
            });
        }

        let records = envelope.result.map(|r| r.records).unwrap_or_default();
        debug!(rows = records.len(), "datastore_search returned");
        Ok(records)
    }
}
