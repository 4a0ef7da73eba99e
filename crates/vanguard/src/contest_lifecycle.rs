//! Contest lifecycle trigger for the points cache (C7), grounded in
//! horus's `scheduler::CleanupScheduler` `Job::new_async` pattern.
//!
//! Polls every minute for contests that just started or just ended and
//! calls `PointsCache::start_contest`/`end_contest` accordingly. Callers
//! that know a contest's start/end exactly (e.g. an admin "start now"
//! action) can call those methods directly instead of waiting for the
//! next poll.

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::points_cache::PointsCache;

pub async fn spawn(db: PgPool, points_cache: PointsCache) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let db = db.clone();
        let points_cache = points_cache.clone();
        Box::pin(async move {
            if let Err(e) = reconcile(&db, &points_cache).await {
                tracing::error!(error = %e, "contest lifecycle reconciliation failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn reconcile(db: &PgPool, points_cache: &PointsCache) -> anyhow::Result<()> {
    let starting: Vec<(Uuid,)> = sqlx::query_as(
        r#"SELECT id FROM contests
           WHERE status = 'active' AND starts_at <= now() AND starts_at > now() - interval '2 minutes'"#,
    )
    .fetch_all(db)
    .await?;

    for (contest_id,) in starting {
        tracing::info!(%contest_id, "contest starting, priming points cache");
        points_cache.start_contest(db, contest_id).await?;
    }

    let ending: Vec<(Uuid,)> = sqlx::query_as(
        r#"SELECT id FROM contests
           WHERE ends_at <= now() AND ends_at > now() - interval '2 minutes'"#,
    )
    .fetch_all(db)
    .await?;

    for (contest_id,) in ending {
        tracing::info!(%contest_id, "contest ending, dropping points cache");
        points_cache.end_contest(db, contest_id).await?;
    }

    Ok(())
}
