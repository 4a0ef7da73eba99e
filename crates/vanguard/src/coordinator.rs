//! Submission Coordinator (C6).
//!
//! Owns submission lifecycle: `submit`/`run`/`validate` create a row and
//! dispatch an `ExecutionTask`; `apply` consumes one `ExecutionResult` from
//! the result consumer (C5) and finalizes the row exactly once. A
//! submission transitions `pending` -> final status precisely one time;
//! a second `apply` for the same id is a no-op (idempotent by
//! submission_id).

use std::sync::Arc;

use chrono::Utc;
use olympus_common::{
    limits, AppError, ContestId, ExecutionResult, ExecutionTask, Language, ProblemId, Queue,
    Status, Submission, SubmissionId, TaskKind, UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::points_cache::PointsCache;
use crate::problem_store::ProblemStore;

pub struct Coordinator {
    db: PgPool,
    queue: Arc<dyn Queue>,
    problems: Arc<dyn ProblemStore>,
    points_cache: PointsCache,
}

impl Coordinator {
    pub fn new(
        db: PgPool,
        queue: Arc<dyn Queue>,
        problems: Arc<dyn ProblemStore>,
        points_cache: PointsCache,
    ) -> Self {
        Self {
            db,
            queue,
            problems,
            points_cache,
        }
    }

    /// Ad-hoc run against caller-provided test cases. Not scored, not
    /// persisted beyond the pending row needed to correlate the result.
    pub async fn run(
        &self,
        user_id: UserId,
        language: Language,
        code: String,
        test_cases: Vec<olympus_common::TestCase>,
        time_limit_ms: Option<u64>,
        memory_limit_kb: Option<u64>,
    ) -> Result<SubmissionId, AppError> {
        let (time_limit_ms, memory_limit_kb) = limits::cap(
            time_limit_ms.unwrap_or(limits::DEFAULT_TIME_MS),
            memory_limit_kb.unwrap_or(limits::DEFAULT_MEM_KB),
        );

        let submission_id = self
            .insert_pending(user_id, None, None, language, &code, TaskKind::Run)
            .await?;

        let num_cases = test_cases.len();
        let task = ExecutionTask {
            submission_id,
            language,
            source: code.into_bytes(),
            test_cases,
            time_limit_ms,
            memory_limit_kb,
            kind: TaskKind::Run,
            contest_id: None,
            problem_id: None,
            points: None,
            penalty: None,
        };

        self.dispatch_or_revert(submission_id, task).await?;
        self.spawn_result_deadline(submission_id, time_limit_ms, num_cases);
        Ok(submission_id)
    }

    /// Scored submission against a problem, optionally inside a contest.
    pub async fn submit(
        &self,
        user_id: UserId,
        problem_id: ProblemId,
        contest_id: Option<ContestId>,
        language: Language,
        code: String,
        points: Option<i64>,
        penalty: Option<i64>,
    ) -> Result<SubmissionId, AppError> {
        let limits = self.problems.get_limits(problem_id).await?;
        if let Some(allowed) = &limits.allowed_languages {
            if !allowed.contains(&language) {
                return Err(AppError::ValidationError(format!(
                    "language {language} is not allowed for this problem"
                )));
            }
        }
        let test_cases = self.problems.get_test_cases(problem_id).await?;
        let (time_limit_ms, memory_limit_kb) =
            limits::cap(limits.time_limit_ms, limits.memory_limit_kb);

        let kind = if contest_id.is_some() {
            TaskKind::ContestSubmit
        } else {
            TaskKind::Submit
        };

        let submission_id = self
            .insert_pending(user_id, Some(problem_id), contest_id, language, &code, kind)
            .await?;

        let num_cases = test_cases.len();
        let task = ExecutionTask {
            submission_id,
            language,
            source: code.into_bytes(),
            test_cases,
            time_limit_ms,
            memory_limit_kb,
            kind,
            contest_id,
            problem_id: Some(problem_id),
            points,
            penalty,
        };

        self.dispatch_or_revert(submission_id, task).await?;
        self.spawn_result_deadline(submission_id, time_limit_ms, num_cases);
        Ok(submission_id)
    }

    /// Validate a problem's authored reference solution against its own
    /// test cases.
    pub async fn validate(&self, problem_id: ProblemId) -> Result<SubmissionId, AppError> {
        let (language, code) = self
            .problems
            .get_solution(problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no reference solution for {problem_id}")))?;
        let limits = self.problems.get_limits(problem_id).await?;
        let test_cases = self.problems.get_test_cases(problem_id).await?;
        let (time_limit_ms, memory_limit_kb) =
            limits::cap(limits.time_limit_ms, limits.memory_limit_kb);

        let submission_id = Uuid::new_v4();
        let task = ExecutionTask {
            submission_id,
            language,
            source: code,
            test_cases,
            time_limit_ms,
            memory_limit_kb,
            kind: TaskKind::Validate,
            contest_id: None,
            problem_id: Some(problem_id),
            points: None,
            penalty: None,
        };

        self.dispatch(task).await?;
        Ok(submission_id)
    }

    /// Fetch a submission's current row.
    pub async fn get_result(&self, submission_id: SubmissionId) -> Result<Submission, AppError> {
        let row: SubmissionRow = sqlx::query_as(
            r#"SELECT id, user_id, problem_id, contest_id, language, source_code AS code,
                      submission_type, status, message
               FROM submissions WHERE id = $1"#,
        )
        .bind(submission_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("submission {submission_id} not found")))?;

        row.into_submission()
    }

    /// Apply one execution result, finalizing the submission exactly once.
    /// Called by the result consumer (C5).
    pub async fn apply(&self, result: ExecutionResult) -> Result<(), AppError> {
        let message = ExecutionResult::first_failure(&result.per_case)
            .map(|(index, status)| format!("test case {index}: {status}"));

        let updated = sqlx::query(
            r#"UPDATE submissions
               SET status = $2, message = $3, max_time_ms = $4, max_memory_kb = $5, judged_at = $6
               WHERE id = $1 AND status = 'pending'"#,
        )
        .bind(result.submission_id)
        .bind(result.aggregate_status.as_str())
        .bind(&message)
        .bind(result.max_runtime_ms as i64)
        .bind(result.max_memory_kb as i64)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if updated.rows_affected() == 0 {
            // Already finalized (duplicate delivery) or unknown submission;
            // either way there is nothing further to do.
            return Ok(());
        }

        if result.kind == TaskKind::ContestSubmit && result.aggregate_status == Status::Accepted {
            self.award_contest_points(&result).await?;
        }

        Ok(())
    }

    async fn award_contest_points(&self, result: &ExecutionResult) -> Result<(), AppError> {
        let Some(context) = &result.context else {
            return Ok(());
        };
        let contest_id = context
            .get("contest_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());
        let problem_id = context
            .get("problem_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());

        let (Some(contest_id), Some(problem_id)) = (contest_id, problem_id) else {
            return Ok(());
        };

        let submission: (Uuid,) =
            sqlx::query_as("SELECT user_id FROM submissions WHERE id = $1")
                .bind(result.submission_id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        let user_id = submission.0;

        self.points_cache
            .record_solve(&self.db, contest_id, user_id, problem_id)
            .await
    }

    async fn dispatch(&self, task: ExecutionTask) -> Result<(), AppError> {
        let body = serde_json::to_vec(&task)
            .map_err(|e| AppError::SerializationError(e.to_string()))?;
        self.queue.push(&task.language.queue_name(), &body).await
    }

    /// Dispatch a task for a submission that already has a pending row; if
    /// publish fails, revert the row with a compensating delete rather than
    /// leave it perpetually pending.
    async fn dispatch_or_revert(
        &self,
        submission_id: SubmissionId,
        task: ExecutionTask,
    ) -> Result<(), AppError> {
        if let Err(e) = self.dispatch(task).await {
            let _ = sqlx::query("DELETE FROM submissions WHERE id = $1")
                .bind(submission_id)
                .execute(&self.db)
                .await;
            return Err(e);
        }
        Ok(())
    }

    /// Spawn a deadline task that finalizes a still-`pending` submission as
    /// `runtime_error` if no result arrives within `RESULT_TIMEOUT`. A
    /// result that arrives first wins the `WHERE status = 'pending'` race
    /// and this update becomes a no-op.
    fn spawn_result_deadline(&self, submission_id: SubmissionId, time_limit_ms: u64, num_cases: usize) {
        let db = self.db.clone();
        let deadline_secs = limits::result_timeout_secs(time_limit_ms, num_cases);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(deadline_secs)).await;

            let result = sqlx::query(
                r#"UPDATE submissions
                   SET status = $2, message = $3, judged_at = $4
                   WHERE id = $1 AND status = 'pending'"#,
            )
            .bind(submission_id)
            .bind(Status::RuntimeError.as_str())
            .bind("timed out waiting for worker")
            .bind(Utc::now())
            .execute(&db)
            .await;

            match result {
                Ok(updated) if updated.rows_affected() > 0 => {
                    tracing::warn!(%submission_id, "submission timed out waiting for worker");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(%submission_id, error = %e, "result deadline finalize failed");
                }
            }
        });
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_pending(
        &self,
        user_id: UserId,
        problem_id: Option<ProblemId>,
        contest_id: Option<ContestId>,
        language: Language,
        code: &str,
        kind: TaskKind,
    ) -> Result<SubmissionId, AppError> {
        let submission_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO submissions
                 (id, user_id, problem_id, contest_id, language, source_code,
                  submission_type, status, submitted_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)"#,
        )
        .bind(submission_id)
        .bind(user_id)
        .bind(problem_id)
        .bind(contest_id)
        .bind(language.tag())
        .bind(code)
        .bind(kind.to_string())
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(submission_id)
    }
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: Uuid,
    user_id: Uuid,
    problem_id: Option<Uuid>,
    contest_id: Option<Uuid>,
    language: String,
    code: String,
    submission_type: String,
    status: String,
    message: Option<String>,
}

impl SubmissionRow {
    fn into_submission(self) -> Result<Submission, AppError> {
        let language = Language::from_tag(&self.language)
            .ok_or_else(|| AppError::InternalError(format!("unknown language tag {}", self.language)))?;
        let status = Status::from_str(&self.status)
            .ok_or_else(|| AppError::InternalError(format!("unknown status tag {}", self.status)))?;
        let kind = match self.submission_type.as_str() {
            "run" => TaskKind::Run,
            "contest_submit" => TaskKind::ContestSubmit,
            "validate" => TaskKind::Validate,
            _ => TaskKind::Submit,
        };

        Ok(Submission {
            id: self.id,
            user_id: self.user_id,
            problem_id: self.problem_id,
            contest_id: self.contest_id,
            language,
            code: self.code,
            kind,
            status,
            message: self.message,
            per_case_results: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(language: &str, status: &str, submission_type: &str) -> SubmissionRow {
        SubmissionRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            problem_id: Some(Uuid::new_v4()),
            contest_id: None,
            language: language.to_string(),
            code: "print(1)".to_string(),
            submission_type: submission_type.to_string(),
            status: status.to_string(),
            message: None,
        }
    }

    #[test]
    fn into_submission_maps_known_tags() {
        let submission = row("python", "accepted", "submit").into_submission().unwrap();
        assert_eq!(submission.language, Language::Python);
        assert_eq!(submission.status, Status::Accepted);
        assert_eq!(submission.kind, TaskKind::Submit);
    }

    #[test]
    fn into_submission_maps_run_and_contest_submit_kinds() {
        assert_eq!(
            row("cpp", "pending", "run").into_submission().unwrap().kind,
            TaskKind::Run
        );
        assert_eq!(
            row("cpp", "pending", "contest_submit")
                .into_submission()
                .unwrap()
                .kind,
            TaskKind::ContestSubmit
        );
    }

    #[test]
    fn into_submission_rejects_unknown_language_tag() {
        let err = row("rust", "accepted", "submit").into_submission().unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
    }

    #[test]
    fn into_submission_rejects_unknown_status_tag() {
        let err = row("python", "graded", "submit").into_submission().unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
    }
}
