//! Retrieval and normalization of resale transactions.
//!
//! [`ListingFetcher`] walks an ordered list of month windows (current month,
//! then previous month) until the dataset returns rows, and turns raw
//! [`DatasetRow`](crate::services::resale_dataset::DatasetRow)s into
//! [`ResaleListing`]s with a derived address and a numeric price.

mod fetcher;
mod types;
mod window;

pub use fetcher::{DEFAULT_LIMIT, ListingFetcher};
pub use types::{ListingDetails, ResaleListing, SearchCriteria};
pub use window::{MonthWindow, candidate_windows};
