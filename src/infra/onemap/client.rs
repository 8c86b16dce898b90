use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::warn;

use crate::error::{ListingError, Result};
use crate::fetch::{HttpClient, fetch_json};
use crate::services::address_search::{AddressMatch, AddressSearch, SearchResponse};

const SERVICE: &str = "onemap";

#[derive(Deserialize)]
struct ElasticSearchResponse {
    #[serde(default)]
    found: u32,
    #[serde(default)]
    results: Vec<ElasticSearchResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct ElasticSearchResult {
    latitude: Option<String>,
    longitude: Option<String>,
    postal: Option<String>,
}

/// Parses a coordinate that OneMap reports as a string.
fn parse_coordinate(raw: Option<&str>, query: &str) -> Option<f64> {
    let raw = raw?;
    match raw.trim().parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(query, value = raw, "Unparseable coordinate from OneMap");
            None
        }
    }
}

/// OneMap elastic-search client.
pub struct OneMapClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl OneMapClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/api/common/elastic/search", self.base_url))
            .map_err(|e| ListingError::Configuration(format!("invalid OneMap URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("searchVal", query)
            .append_pair("returnGeom", "Y")
            .append_pair("getAddrDetails", "Y")
            .append_pair("pageNum", "1");
        Ok(url)
    }
}

#[async_trait]
impl AddressSearch for OneMapClient {
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let url = self.search_url(query)?;
        let body: ElasticSearchResponse = fetch_json(self.http.as_ref(), SERVICE, url).await?;

        let results = body
            .results
            .into_iter()
            .map(|r| AddressMatch {
                latitude: parse_coordinate(r.latitude.as_deref(), query),
                longitude: parse_coordinate(r.longitude.as_deref(), query),
                postal_code: r.postal,
            })
            .collect();

        Ok(SearchResponse {
            found: body.found,
            results,
        })
    }
}
