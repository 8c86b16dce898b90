//! Error type shared by the fetch, geocode and aggregation stages.

use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by the listing pipeline.
///
/// "Nothing found" states are not errors: an empty dataset window yields an
/// empty result and an unmatched address yields an empty coordinate.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} request timed out after {after:?}")]
    Timeout {
        service: &'static str,
        after: Duration,
    },
    #[error("{service} returned status {status}: {body}")]
    UpstreamStatus {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} response could not be decoded: {details}")]
    Decode {
        service: &'static str,
        details: String,
    },
    #[error("listing {record} has non-numeric {field}: {value:?}")]
    MalformedData {
        record: String,
        field: &'static str,
        value: String,
    },
    #[error("no listing found for {block} {street} in {month}")]
    ListingNotFound {
        block: String,
        street: String,
        month: String,
    },
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
    #[error("geocode task did not complete: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ListingError {
    /// Returns `true` for failures talking to an upstream service.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ListingError::Transport { .. }
                | ListingError::Timeout { .. }
                | ListingError::UpstreamStatus { .. }
                | ListingError::Decode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ListingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let status = ListingError::UpstreamStatus {
            service: "onemap",
            status: 503,
            body: String::new(),
        };
        assert!(status.is_transport());

        let malformed = ListingError::MalformedData {
            record: "123 ANG MO KIO AVE 3".to_string(),
            field: "resale_price",
            value: "n/a".to_string(),
        };
        assert!(!malformed.is_transport());
    }

    #[test]
    fn test_malformed_message_names_field() {
        let err = ListingError::MalformedData {
            record: "1 BEDOK NTH RD".to_string(),
            field: "resale_price",
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "listing 1 BEDOK NTH RD has non-numeric resale_price: \"abc\""
        );
    }
}
