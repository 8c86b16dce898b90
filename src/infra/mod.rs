//! HTTP implementations of the service contracts.

pub mod datagov;
pub mod onemap;
