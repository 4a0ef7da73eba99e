//! Contest Points Cache (C7).
//!
//! Caches per-(contest, problem) point values for the duration of a
//! contest, and records first-solve facts so points are awarded exactly
//! once per (contest, user, problem) triple even under duplicate result
//! delivery. Grounded in vanguard's existing
//! `deadpool_redis::Pool` + `redis::cmd(...).query_async()` idiom (see
//! `domain::problems::handler`'s cache usage).

use chrono::Utc;
use deadpool_redis::Pool as RedisPool;
use olympus_common::{limits, AppError, ContestId, ProblemId, UserId};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PointsCache {
    redis: RedisPool,
}

impl PointsCache {
    pub fn new(redis: RedisPool) -> Self {
        Self { redis }
    }

    fn key(contest_id: ContestId, problem_id: ProblemId) -> String {
        format!("points:{contest_id}:{problem_id}")
    }

    /// Cache a problem's point value for the lifetime of the contest.
    pub async fn set(
        &self,
        contest_id: ContestId,
        problem_id: ProblemId,
        points: i64,
    ) -> Result<(), AppError> {
        let mut conn = self
            .redis
            .get()
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        redis::cmd("SET")
            .arg(Self::key(contest_id, problem_id))
            .arg(points)
            .arg("EX")
            .arg(limits::CACHE_TTL_HOURS * 3600)
            .query_async::<()>(&mut *conn)
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        Ok(())
    }

    /// Read a problem's cached point value, if still live.
    pub async fn get(
        &self,
        contest_id: ContestId,
        problem_id: ProblemId,
    ) -> Result<Option<i64>, AppError> {
        let mut conn = self
            .redis
            .get()
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        let value: Option<i64> = redis::cmd("GET")
            .arg(Self::key(contest_id, problem_id))
            .query_async(&mut *conn)
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        Ok(value)
    }

    pub async fn del(&self, contest_id: ContestId, problem_id: ProblemId) -> Result<(), AppError> {
        let mut conn = self
            .redis
            .get()
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        redis::cmd("DEL")
            .arg(Self::key(contest_id, problem_id))
            .query_async::<()>(&mut *conn)
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        Ok(())
    }

    /// Populate the cache for every problem in a contest as it starts.
    pub async fn start_contest(
        &self,
        db: &PgPool,
        contest_id: ContestId,
    ) -> Result<(), AppError> {
        let rows: Vec<(Uuid, i32)> = sqlx::query_as(
            "SELECT problem_id, points FROM contest_problems WHERE contest_id = $1",
        )
        .bind(contest_id)
        .fetch_all(db)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        for (problem_id, points) in rows {
            self.set(contest_id, problem_id, points as i64).await?;
        }
        Ok(())
    }

    /// Drop every cached entry for a contest as it ends; points can no
    /// longer be awarded once its cache entries are gone.
    pub async fn end_contest(&self, db: &PgPool, contest_id: ContestId) -> Result<(), AppError> {
        let problem_ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT problem_id FROM contest_problems WHERE contest_id = $1")
                .bind(contest_id)
                .fetch_all(db)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        for (problem_id,) in problem_ids {
            self.del(contest_id, problem_id).await?;
        }
        Ok(())
    }

    /// Record a first-solve fact and award points, but only if the cache
    /// still has a live entry for this (contest, problem) at acceptance
    /// time -- a cache miss means the contest already ended (or the TTL
    /// expired) and no fact is created, full stop. A unique constraint on
    /// `(contest_id, user_id, problem_id)` makes the insert itself safe
    /// under races: the losing insert is a silent no-op (grounded in
    /// `domain::auth::handler::register`'s uniqueness-check pattern).
    pub async fn record_solve(
        &self,
        db: &PgPool,
        contest_id: ContestId,
        user_id: UserId,
        problem_id: ProblemId,
    ) -> Result<(), AppError> {
        let Some(points) = self.get(contest_id, problem_id).await? else {
            tracing::debug!(%contest_id, %user_id, %problem_id, "no live points cache entry, skipping solve fact");
            return Ok(());
        };

        let result = sqlx::query(
            r#"INSERT INTO contest_solved_facts
                 (contest_id, user_id, problem_id, solved_at, awarded_points)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (contest_id, user_id, problem_id) DO NOTHING"#,
        )
        .bind(contest_id)
        .bind(user_id)
        .bind(problem_id)
        .bind(Utc::now())
        .bind(points)
        .execute(db)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            tracing::debug!(%contest_id, %user_id, %problem_id, "solve already recorded, skipping points award");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_and_namespaced_per_problem() {
        let contest_id = Uuid::new_v4();
        let problem_a = Uuid::new_v4();
        let problem_b = Uuid::new_v4();

        let key_a = PointsCache::key(contest_id, problem_a);
        let key_b = PointsCache::key(contest_id, problem_b);

        assert!(key_a.starts_with("points:"));
        assert_ne!(key_a, key_b);
        assert_eq!(key_a, PointsCache::key(contest_id, problem_a));
    }
}
