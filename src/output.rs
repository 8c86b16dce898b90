//! Output formatting for enriched listings.
//!
//! Supports pretty JSON on stdout and CSV files.

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::pipeline::EnrichedListing;
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;

/// Flat CSV row; nested coordinates are spread into columns.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    month: &'a str,
    town: &'a str,
    address: &'a str,
    flat_type: &'a str,
    storey_range: &'a str,
    floor_area_sqm: &'a str,
    flat_model: &'a str,
    remaining_lease: Option<&'a str>,
    resale_price: f64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    tier: &'static str,
}

impl<'a> From<&'a EnrichedListing> for CsvRow<'a> {
    fn from(e: &'a EnrichedListing) -> Self {
        Self {
            month: &e.listing.month,
            town: &e.listing.town,
            address: &e.listing.address,
            flat_type: &e.listing.flat_type,
            storey_range: &e.listing.storey_range,
            floor_area_sqm: &e.listing.floor_area_sqm,
            flat_model: &e.listing.flat_model,
            remaining_lease: e.listing.remaining_lease.as_deref(),
            resale_price: e.listing.resale_price,
            latitude: e.coordinates.latitude,
            longitude: e.coordinates.longitude,
            tier: e.tier.as_str(),
        }
    }
}

/// Writes any serializable value as pretty JSON followed by a newline.
pub fn write_json<W: Write>(mut out: W, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Writes listings as CSV with a header row.
pub fn write_csv<W: Write>(out: W, listings: &[EnrichedListing]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(out);

    for listing in listings {
        writer.serialize(CsvRow::from(listing))?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes listings to a CSV file at `path`, replacing any existing file.
pub fn write_csv_file(path: &str, listings: &[EnrichedListing]) -> Result<()> {
    debug!(path, rows = listings.len(), "Writing CSV");
    let file = File::create(path)?;
    write_csv(file, listings)
}
