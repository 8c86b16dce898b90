use crate::error::{ListingError, Result};
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// data.gov.sg accepts an optional key in `x-api-key`, which lifts the
/// anonymous rate limit on `datastore_search`.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
}

impl<C> ApiKey<C> {
    /// Validates the header name and value up front so `execute` never fails
    /// on them.
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|e| ListingError::Configuration(format!("invalid header name: {e}")))?;
        let mut key = HeaderValue::from_str(key)
            .map_err(|e| ListingError::Configuration(format!("invalid API key: {e}")))?;
        key.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            key,
        })
    }

    pub fn x_api_key(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, "x-api-key", key)
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.key.clone());
        self.inner.execute(req).await
    }
}
