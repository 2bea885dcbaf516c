//! `upl status`: list unfinished chunked uploads.

use anyhow::Result;
use std::time::{SystemTime, UNIX_EPOCH};
use upl_core::resume_store::ResumeStore;

use super::format_bytes;

fn age(updated_at: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(updated_at);
    let secs = (now - updated_at).max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

pub async fn run_status() -> Result<()> {
    let store = ResumeStore::open_default().await?;
    let records = store.list().await?;
    if records.is_empty() {
        println!("No unfinished uploads.");
        return Ok(());
    }
    println!("{:<6} {:>7} {:>22} {}", "AGE", "DONE", "BYTES", "FILE");
    for r in records {
        let pct = if r.file_size == 0 {
            100.0
        } else {
            r.uploaded_bytes as f64 * 100.0 / r.file_size as f64
        };
        println!(
            "{:<6} {:>6.1}% {:>22} {}",
            age(r.updated_at),
            pct,
            format!("{}/{}", format_bytes(r.uploaded_bytes), format_bytes(r.file_size)),
            r.file_path
        );
    }
    Ok(())
}
