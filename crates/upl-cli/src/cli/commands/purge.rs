//! `upl purge`: drop stale resume records.

use anyhow::Result;
use std::time::Duration;
use upl_core::resume_store::ResumeStore;

pub async fn run_purge(max_age_hours: u64) -> Result<()> {
    let store = ResumeStore::open_default().await?;
    let removed = store
        .purge_older_than(Duration::from_secs(max_age_hours.saturating_mul(3600)))
        .await?;
    tracing::info!("purged {} resume record(s) older than {}h", removed, max_age_hours);
    println!("Purged {} resume record(s).", removed);
    Ok(())
}
