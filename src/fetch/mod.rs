mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::{ListingError, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Issues a GET through `client` and decodes the JSON body.
///
/// Non-2xx statuses become [`ListingError::UpstreamStatus`] carrying the
/// response body.
pub async fn fetch_json<C, T>(client: &C, service: &'static str, url: Url) -> Result<T>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    debug!(service, url = %url, "GET");
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client
        .execute(req)
        .await
        .map_err(|source| ListingError::Transport { service, source })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ListingError::UpstreamStatus {
            service,
            status: status.as_u16(),
            body,
        });
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|source| ListingError::Transport { service, source })?;

    serde_json::from_slice(&bytes).map_err(|e| ListingError::Decode {
        service,
        details: e.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::stub::StubClient;
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Body {
        found: u32,
    }

    fn url() -> Url {
        "https://example.test/search".parse().unwrap()
    }

    #[tokio::test]
    async fn test_fetch_json_decodes_body() {
        let client = StubClient::new(200, r#"{"found": 3}"#);
        let body: Body = fetch_json(&client, "test", url()).await.unwrap();
        assert_eq!(body.found, 3);
    }

    #[tokio::test]
    async fn test_fetch_json_non_success_status() {
        let client = StubClient::new(429, "slow down");
        let err = fetch_json::<_, Body>(&client, "test", url()).await.unwrap_err();
        match err {
            ListingError::UpstreamStatus { status, body, .. } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_json_invalid_body() {
        let client = StubClient::new(200, "<html>");
        let err = fetch_json::<_, Body>(&client, "test", url()).await.unwrap_err();
        assert!(matches!(err, ListingError::Decode { .. }));
    }
}
