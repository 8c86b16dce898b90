//! Trait and types for an address-search (geocoding) provider.

use crate::error::Result;

/// One candidate returned by an address search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressMatch {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub postal_code: Option<String>,
}

/// Result of a single address search.
///
/// `found == 0` means the provider had no match; that is a normal outcome,
/// not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub found: u32,
    pub results: Vec<AddressMatch>,
}

impl SearchResponse {
    /// The match the pipeline uses, if the provider reported any.
    pub fn best(&self) -> Option<&AddressMatch> {
        if self.found == 0 {
            None
        } else {
            self.results.first()
        }
    }
}

/// Abstraction over an address-search provider (e.g., OneMap).
#[async_trait::async_trait]
pub trait AddressSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResponse>;
}
