//! `upl checksum`: SHA-256 of a file, as the catalog computes it.

use anyhow::Result;
use std::path::Path;
use upl_core::checksum;

pub async fn run_checksum(path: &Path) -> Result<()> {
    let digest = checksum::sha256_path(path)?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
