//! Worker Loop.
//!
//! One `sisyphus` process instance serves one or more language tags
//! (`WORKER_LANGUAGES`). For each tag it runs an independent loop:
//! blocking-pop `queue:<language>`, parse, execute via `minos::Executor`,
//! push the serialized result to `queue:results` with capped exponential
//! backoff on push failure. No new pop happens while a push is retrying.

use std::sync::Arc;

use olympus_common::{limits, Backoff, ExecutionTask, Language, Queue};
use tokio_util::sync::CancellationToken;

use minos::Executor;

/// Run the loop for a single language tag until `cancel` is triggered.
pub async fn run_language_loop(
    language: Language,
    queue: Arc<dyn Queue>,
    executor: Arc<Executor>,
    cancel: CancellationToken,
) {
    let queue_name = language.queue_name();
    tracing::info!(language = %language, queue = %queue_name, "worker loop starting");

    loop {
        if cancel.is_cancelled() {
            tracing::info!(language = %language, "worker loop exiting on cancellation");
            return;
        }

        let popped = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(language = %language, "worker loop cancelled during pop");
                return;
            }
            result = queue.blocking_pop(&queue_name, limits::POP_TIMEOUT_SECS) => result,
        };

        let payload = match popped {
            Ok(Some(payload)) => payload,
            Ok(None) => continue, // pop timed out, nothing to do
            Err(e) => {
                tracing::error!(language = %language, error = %e, "queue pop failed");
                continue;
            }
        };

        let task: ExecutionTask = match serde_json::from_slice(&payload) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(language = %language, error = %e, "dropping malformed task payload");
                continue; // malformed: dropped and logged, never re-queued
            }
        };

        let submission_id = task.submission_id;
        let result = executor.execute(&task).await;

        let body = match serde_json::to_vec(&result) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(%submission_id, error = %e, "failed to serialize execution result");
                continue;
            }
        };

        push_with_backoff(&*queue, &body, &cancel, submission_id).await;
    }
}

async fn push_with_backoff(
    queue: &dyn Queue,
    body: &[u8],
    cancel: &CancellationToken,
    submission_id: olympus_common::SubmissionId,
) {
    let mut backoff = Backoff::new(limits::RETRY_BACKOFF_CAP_SECS);

    loop {
        match queue.push("queue:results", body).await {
            Ok(()) => return,
            Err(e) => {
                if cancel.is_cancelled() {
                    tracing::warn!(%submission_id, "dropping result push during shutdown");
                    return;
                }
                let delay = backoff.next_delay();
                tracing::error!(%submission_id, error = %e, delay_secs = delay.as_secs(), "result push failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
