//! Trait and types for querying the resale transaction dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a filter value is compared by the dataset API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchType {
    /// Case-insensitive substring match.
    #[serde(rename = "ILIKE")]
    Ilike,
    #[serde(rename = "numeric")]
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFilter {
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub value: String,
}

/// Field → filter mapping, serialized as the `filters` query parameter.
///
/// Ordered so the encoded query is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryFilters(BTreeMap<String, FieldFilter>);

impl QueryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ilike(mut self, field: &str, value: impl Into<String>) -> Self {
        self.0.insert(
            field.to_string(),
            FieldFilter {
                match_type: MatchType::Ilike,
                value: value.into(),
            },
        );
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldFilter> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One record exactly as the dataset returns it.
///
/// Text columns arrive as strings; `resale_price` may be a string or a
/// number depending on the resource, so it is kept as raw JSON until the
/// fetcher normalizes it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetRow {
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub flat_type: String,
    #[serde(default)]
    pub block: String,
    #[serde(default)]
    pub street_name: String,
    #[serde(default)]
    pub storey_range: String,
    #[serde(default)]
    pub floor_area_sqm: String,
    #[serde(default)]
    pub flat_model: String,
    #[serde(default)]
    pub lease_commence_date: Option<String>,
    #[serde(default)]
    pub remaining_lease: Option<String>,
    #[serde(default)]
    pub resale_price: serde_json::Value,
}

/// Abstraction over the resale dataset (e.g., data.gov.sg `datastore_search`).
#[async_trait::async_trait]
pub trait ResaleDataset: Send + Sync {
    /// Returns at most `limit` rows matching every filter, in dataset order.
    async fn query(&self, filters: &QueryFilters, limit: usize) -> Result<Vec<DatasetRow>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_serialize_as_dataset_expects() {
        let filters = QueryFilters::new()
            .ilike("town", "BEDOK")
            .ilike("month", "2024-05")
            .ilike("flat_type", "4 ROOM");
        assert_eq!(
            filters.to_json(),
            r#"{"flat_type":{"type":"ILIKE","value":"4 ROOM"},"month":{"type":"ILIKE","value":"2024-05"},"town":{"type":"ILIKE","value":"BEDOK"}}"#
        );
    }

    #[test]
    fn test_numeric_match_type_wire_name() {
        let filter = FieldFilter {
            match_type: MatchType::Numeric,
            value: "92".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&filter).unwrap(),
            r#"{"type":"numeric","value":"92"}"#
        );
    }

    #[test]
    fn test_row_accepts_numeric_price_and_missing_columns() {
        let row: DatasetRow = serde_json::from_str(
            r#"{"_id": 1, "block": "406", "street_name": "ANG MO KIO AVE 10", "resale_price": 267000}"#,
        )
        .unwrap();
        assert_eq!(row.block, "406");
        assert_eq!(row.resale_price, serde_json::json!(267000));
        assert!(row.remaining_lease.is_none());
    }
}
