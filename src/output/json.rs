//! JSON batch export of finished listings

use crate::listing::Listing;
use crate::output::OutputError;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Writes listings as one pretty-printed JSON array
///
/// Parent directories are created as needed. Listings whose photos were
/// never looked at omit `photos_urls`; listings without photos carry `null`.
pub fn write_listings_json(path: &Path, listings: &[Listing]) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, listings)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!("Wrote {} listings to {}", listings.len(), path.display());
    Ok(())
}

/// Reads a batch written by [`write_listings_json`]
pub fn read_listings_json(path: &Path) -> Result<Vec<Listing>, OutputError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
