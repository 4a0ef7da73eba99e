//! Result Consumer (C5).
//!
//! A single long-lived task that blocking-pops `queue:results` and hands
//! each `ExecutionResult` to the Submission Coordinator's `apply`, which is
//! idempotent by submission_id -- so redelivery after a crash is safe.

use std::sync::Arc;

use olympus_common::{limits, ExecutionResult, Queue};
use tokio_util::sync::CancellationToken;

use crate::coordinator::Coordinator;

pub async fn run(coordinator: Arc<Coordinator>, queue: Arc<dyn Queue>, cancel: CancellationToken) {
    tracing::info!("result consumer starting");

    loop {
        let popped = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("result consumer exiting on cancellation");
                return;
            }
            result = queue.blocking_pop("queue:results", limits::POP_TIMEOUT_SECS) => result,
        };

        let payload = match popped {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(error = %e, "result queue pop failed");
                continue;
            }
        };

        let result: ExecutionResult = match serde_json::from_slice(&payload) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed execution result");
                continue;
            }
        };

        let submission_id = result.submission_id;
        if let Err(e) = coordinator.apply(result).await {
            tracing::error!(%submission_id, error = %e, "failed to apply execution result");
        }
    }
}
