//! Run every file's session with at most `max_concurrent` requests in flight.
//!
//! All files are spawned into one `JoinSet` up front; a semaphore permit is
//! held for the length of one attempt and released during retry backoff, so
//! a file waiting to retry never blocks a worker slot.

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use super::stats::UploadStatistics;
use super::{assign_subdirectories, FileCompleted, RunReport, ScheduleOptions};
use crate::catalog::{dedup_records, FileRecord};
use crate::error::UploadError;
use crate::retry::{classify, RetryDecision, RetryPolicy};
use crate::session::{SessionContext, UploadOutcome, UploadSession};

/// Upload `records` and return once every file reached a terminal state.
///
/// Records sharing a canonical path are uploaded once. One file's failure
/// never stops the others. If `events` is `Some`, one
/// [`FileCompleted`] is sent per file from the completion loop.
pub async fn run_uploads(
    ctx: Arc<SessionContext>,
    mut records: Vec<FileRecord>,
    opts: &ScheduleOptions,
    events: Option<mpsc::Sender<FileCompleted>>,
) -> RunReport {
    let dropped = dedup_records(&mut records);
    if dropped > 0 {
        tracing::warn!("ignoring {} duplicate file(s)", dropped);
    }
    assign_subdirectories(&mut records, &opts.subdir, opts.preserve_structure);
    let mut stats = UploadStatistics::start(&records);
    let semaphore = Arc::new(Semaphore::new(opts.max_concurrent.max(1)));
    tracing::info!(
        "uploading {} files ({} bytes), {} at a time",
        stats.total_files,
        stats.total_bytes,
        opts.max_concurrent.max(1)
    );

    let mut finished = vec![false; records.len()];
    let mut join_set = JoinSet::new();
    for (index, record) in records.iter().cloned().enumerate() {
        let ctx = Arc::clone(&ctx);
        let semaphore = Arc::clone(&semaphore);
        let policy = opts.retry;
        join_set.spawn(async move { (index, upload_with_retry(&ctx, record, &semaphore, &policy).await) });
    }

    let mut outcomes = Vec::with_capacity(records.len());
    while let Some(res) = join_set.join_next().await {
        let (index, outcome) = match res {
            Ok(done) => done,
            Err(e) => {
                // Which file this was is settled after the loop.
                tracing::error!("upload task join: {}", e);
                continue;
            }
        };
        finished[index] = true;
        stats.record(&outcome);
        notify(&events, &outcome, &stats).await;
        outcomes.push(outcome);
    }

    for (index, record) in records.into_iter().enumerate() {
        if finished[index] {
            continue;
        }
        let outcome = UploadOutcome {
            strategy: ctx.settings.strategy_for(record.size),
            record,
            result: Err(UploadError::Worker("upload task ended without a result".to_string())),
            attempts: 1,
        };
        stats.record_failure();
        notify(&events, &outcome, &stats).await;
        outcomes.push(outcome);
    }

    stats.finish();
    tracing::info!(
        "run finished: {}/{} uploaded, {} failed, {:.1}s",
        stats.uploaded_files,
        stats.total_files,
        stats.failed_files,
        stats.duration().as_secs_f64()
    );
    RunReport { stats, outcomes }
}

async fn notify(
    events: &Option<mpsc::Sender<FileCompleted>>,
    outcome: &UploadOutcome,
    stats: &UploadStatistics,
) {
    let Some(tx) = events else {
        return;
    };
    let event = FileCompleted {
        relative_path: outcome.record.relative_path.clone(),
        size: outcome.record.size,
        succeeded: outcome.succeeded(),
        attempts: outcome.attempts,
        error: outcome.error_detail(),
        progress: stats.progress(),
    };
    // A dropped receiver only means nobody is watching.
    let _ = tx.send(event).await;
}

/// Run sessions for one file until success, a non-retryable error, or the attempt limit.
async fn upload_with_retry(
    ctx: &SessionContext,
    record: FileRecord,
    semaphore: &Semaphore,
    policy: &RetryPolicy,
) -> UploadOutcome {
    let mut attempt = 1;
    loop {
        let mut outcome = match semaphore.acquire().await {
            Ok(_permit) => UploadSession::new(&record, ctx).run().await,
            Err(_) => UploadOutcome {
                record: record.clone(),
                strategy: ctx.settings.strategy_for(record.size),
                result: Err(UploadError::Worker("worker pool closed".to_string())),
                attempts: attempt,
            },
        };
        outcome.attempts = attempt;

        let Some(err) = outcome.error() else {
            return outcome;
        };
        if ctx.cancel.is_cancelled() {
            return outcome;
        }
        match policy.decide(attempt, classify(err)) {
            RetryDecision::NoRetry => return outcome,
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    "retrying {} in {:?} (attempt {}/{}): {}",
                    record.relative_path,
                    delay,
                    attempt + 1,
                    policy.max_attempts,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
