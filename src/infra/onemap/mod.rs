mod client;

pub use client::OneMapClient;
