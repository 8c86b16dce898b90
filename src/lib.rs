pub mod affordability;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod infra;
pub mod listings;
pub mod output;
pub mod pipeline;
pub mod services;
