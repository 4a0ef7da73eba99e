//! Problem Store: the Submission Coordinator's read-only view onto a
//! problem's limits, test cases, and reference solution.
//!
//! Kept as a narrow trait so the coordinator can be exercised against an
//! in-memory double in tests without a running Postgres instance.

use async_trait::async_trait;
use olympus_common::{AppError, Language, ProblemId, TestCase};
use sqlx::PgPool;

/// Everything the coordinator needs to know about a problem to build an
/// `ExecutionTask`.
#[derive(Debug, Clone)]
pub struct ProblemLimits {
    pub time_limit_ms: u64,
    pub memory_limit_kb: u64,
    pub allowed_languages: Option<Vec<Language>>,
}

#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn get_limits(&self, problem_id: ProblemId) -> Result<ProblemLimits, AppError>;
    async fn get_test_cases(&self, problem_id: ProblemId) -> Result<Vec<TestCase>, AppError>;
    async fn get_solution(
        &self,
        problem_id: ProblemId,
    ) -> Result<Option<(Language, Vec<u8>)>, AppError>;
}

/// Postgres-backed implementation, grounded in the existing problem
/// handler's row-mapping style (`domain::problems::handler::ProblemRow`).
pub struct PgProblemStore {
    db: PgPool,
}

impl PgProblemStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(sqlx::FromRow)]
struct LimitsRow {
    time_limit_ms: i32,
    memory_limit_kb: i32,
    allowed_languages: Option<Vec<String>>,
}

#[derive(sqlx::FromRow)]
struct TestCaseRow {
    id: i64,
    input: Vec<u8>,
    expected_output: Vec<u8>,
}

#[derive(sqlx::FromRow)]
struct SolutionRow {
    language: String,
    source_code: Vec<u8>,
}

#[async_trait]
impl ProblemStore for PgProblemStore {
    async fn get_limits(&self, problem_id: ProblemId) -> Result<ProblemLimits, AppError> {
        let row: LimitsRow = sqlx::query_as(
            "SELECT time_limit_ms, memory_limit_kb, allowed_languages FROM problems WHERE id = $1",
        )
        .bind(problem_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("problem {problem_id} not found")))?;

        let allowed_languages = row
            .allowed_languages
            .map(|tags| tags.iter().filter_map(|t| Language::from_tag(t)).collect());

        Ok(ProblemLimits {
            time_limit_ms: row.time_limit_ms as u64,
            memory_limit_kb: row.memory_limit_kb as u64,
            allowed_languages,
        })
    }

    async fn get_test_cases(&self, problem_id: ProblemId) -> Result<Vec<TestCase>, AppError> {
        let rows: Vec<TestCaseRow> = sqlx::query_as(
            "SELECT id, input, expected_output FROM problem_test_cases WHERE problem_id = $1 ORDER BY id",
        )
        .bind(problem_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| TestCase {
                id: r.id,
                input: r.input,
                expected_output: r.expected_output,
            })
            .collect())
    }

    async fn get_solution(
        &self,
        problem_id: ProblemId,
    ) -> Result<Option<(Language, Vec<u8>)>, AppError> {
        let row: Option<SolutionRow> = sqlx::query_as(
            "SELECT language, source_code FROM problem_solutions WHERE problem_id = $1",
        )
        .bind(problem_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.and_then(|r| Language::from_tag(&r.language).map(|lang| (lang, r.source_code))))
    }
}

/// In-memory double for coordinator tests, grounded in vanguard's existing
/// `test_utils` swappable-infrastructure pattern.
#[cfg(test)]
pub struct FakeProblemStore {
    pub limits: ProblemLimits,
    pub test_cases: Vec<TestCase>,
    pub solution: Option<(Language, Vec<u8>)>,
}

#[cfg(test)]
#[async_trait]
impl ProblemStore for FakeProblemStore {
    async fn get_limits(&self, _problem_id: ProblemId) -> Result<ProblemLimits, AppError> {
        Ok(self.limits.clone())
    }

    async fn get_test_cases(&self, _problem_id: ProblemId) -> Result<Vec<TestCase>, AppError> {
        Ok(self.test_cases.clone())
    }

    async fn get_solution(
        &self,
        _problem_id: ProblemId,
    ) -> Result<Option<(Language, Vec<u8>)>, AppError> {
        Ok(self.solution.clone())
    }
}
