//! Contracts for the upstream services the pipeline consumes.

pub mod address_search;
pub mod resale_dataset;
