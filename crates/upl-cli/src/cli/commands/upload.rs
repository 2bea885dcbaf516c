//! `upl upload`: build the catalog, then run the scheduler over it.

use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use upl_core::catalog::{dedup_records, FileRecord, Validator};
use upl_core::config::UplConfig;
use upl_core::control::CancelToken;
use upl_core::resume_store::ResumeStore;
use upl_core::scheduler::{self, FileCompleted, ScheduleOptions};
use upl_core::session::{SessionContext, Strategy};
use upl_core::transport::{CurlTransport, TransportOptions};

use super::format_bytes;
use crate::cli::UploadArgs;

/// Named files are checked one by one and rejections reported; directories
/// are scanned and anything filtered out is skipped silently.
fn build_catalog(validator: &Validator, args: &UploadArgs, max_depth: usize) -> Vec<FileRecord> {
    let mut records = Vec::new();
    for path in args.paths.iter().chain(args.dir.iter()) {
        if path.is_dir() {
            let found = validator.scan(path, max_depth);
            tracing::info!("found {} file(s) in {}", found.len(), path.display());
            records.extend(found);
            continue;
        }
        match validator.record_for(path) {
            Ok(record) => records.push(record),
            Err(reason) => {
                tracing::warn!("skipping {}: {}", path.display(), reason);
                eprintln!("skipping {}: {}", path.display(), reason);
            }
        }
    }
    let dropped = dedup_records(&mut records);
    if dropped > 0 {
        tracing::info!("{} file(s) listed more than once, uploading each once", dropped);
    }
    records
}

fn print_plan(records: &[FileRecord], cfg: &UplConfig) {
    let settings = cfg.transfer_settings();
    println!("{:<8} {:>10} {:<24} {}", "MODE", "SIZE", "TYPE", "FILE");
    for r in records {
        let mode = match settings.strategy_for(r.size) {
            Strategy::Simple => "simple",
            Strategy::Chunked => "chunked",
        };
        println!(
            "{:<8} {:>10} {:<24} {}",
            mode,
            format_bytes(r.size),
            r.mime_type,
            r.relative_path
        );
    }
    let total: u64 = records.iter().map(|r| r.size).sum();
    println!("{} file(s), {} (dry run, nothing sent)", records.len(), format_bytes(total));
}

/// Resume store for this run; unavailable storage only disables resuming.
async fn open_store(cfg: &UplConfig) -> Option<ResumeStore> {
    if !cfg.resume_enabled {
        return None;
    }
    let store = match ResumeStore::open_default().await {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!("resume store unavailable, uploads will not resume: {:#}", e);
            return None;
        }
    };
    match store.purge_older_than(cfg.resume_max_age()).await {
        Ok(0) => {}
        Ok(n) => tracing::info!("purged {} stale resume record(s)", n),
        Err(e) => tracing::warn!("could not purge stale resume records: {:#}", e),
    }
    Some(store)
}

fn print_event(ev: &FileCompleted) {
    let p = &ev.progress;
    let counter = format!("[{}/{}]", p.files_done, p.total_files);
    if ev.succeeded {
        println!("{} ok      {} ({})", counter, ev.relative_path, format_bytes(ev.size));
    } else {
        println!(
            "{} FAILED  {} after {} attempt(s): {}",
            counter,
            ev.relative_path,
            ev.attempts,
            ev.error.as_deref().unwrap_or("unknown error")
        );
    }
}

/// Returns `Ok(false)` if any file failed.
pub async fn run_upload(mut cfg: UplConfig, args: &UploadArgs, quiet: bool) -> Result<bool> {
    args.apply(&mut cfg);
    cfg.validate()?;

    let validator = Validator::new(cfg.filter_rules()?);
    let records = build_catalog(&validator, args, cfg.max_depth);
    if records.is_empty() {
        bail!("no valid files to upload");
    }

    if args.dry_run {
        print_plan(&records, &cfg);
        return Ok(true);
    }
    cfg.require_key()?;

    let store = open_store(&cfg).await;
    let transport = Arc::new(CurlTransport::new(TransportOptions::from_config(&cfg)));
    tracing::info!("uploading to {}", transport.url());

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupted: letting in-flight chunks finish, then stopping");
            tracing::warn!("cancellation requested");
            on_interrupt.cancel();
        }
    });

    let ctx = Arc::new(
        SessionContext::new(transport, store, cfg.transfer_settings()).with_cancel(cancel),
    );
    let opts = ScheduleOptions::from_config(&cfg, args.subdir.as_deref());

    let (tx, mut rx) = mpsc::channel::<FileCompleted>(32);
    let printer = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            if !quiet {
                print_event(&ev);
            }
        }
    });

    let report = scheduler::run_uploads(ctx, records, &opts, Some(tx)).await;
    let _ = printer.await;

    let stats = &report.stats;
    println!();
    println!(
        "Uploaded {}/{} file(s), {} failed ({:.1}% success)",
        stats.uploaded_files,
        stats.total_files,
        stats.failed_files,
        stats.success_rate()
    );
    println!(
        "{} in {:.1}s ({}/s)",
        format_bytes(stats.uploaded_bytes),
        stats.duration().as_secs_f64(),
        format_bytes(stats.throughput() as u64)
    );
    if !stats.all_succeeded() {
        for outcome in report.outcomes.iter().filter(|o| !o.succeeded()) {
            let detail = outcome.error_detail().unwrap_or_default();
            eprintln!("failed: {}: {}", outcome.record.path.display(), detail);
        }
    }
    Ok(stats.all_succeeded())
}
