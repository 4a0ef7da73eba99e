//! Common types used across Olympus services.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User ID type
pub type UserId = Uuid;

/// Contest ID type
pub type ContestId = Uuid;

/// Problem ID type
pub type ProblemId = Uuid;

/// Submission ID type
pub type SubmissionId = Uuid;

/// Test case ID type
pub type TestCaseId = i64;

/// User role in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full system access
    Admin,
    /// Can create/manage contests and problems
    Organizer,
    /// Can participate in contests and submit solutions
    Participant,
    /// Can view public contests and leaderboards
    Spectator,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Participant
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Organizer => write!(f, "organizer"),
            UserRole::Participant => write!(f, "participant"),
            UserRole::Spectator => write!(f, "spectator"),
        }
    }
}

/// Contest status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestStatus {
    /// Contest is being prepared
    Draft,
    /// Contest is open for registration
    Registration,
    /// Contest is active
    Running,
    /// Contest has ended
    Finished,
    /// Contest is archived
    Archived,
}

impl Default for ContestStatus {
    fn default() -> Self {
        ContestStatus::Draft
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    /// Calculate offset for SQL queries
    pub fn offset(&self) -> u32 {
        (self.page.saturating_sub(1)) * self.per_page
    }

    /// Get limit for SQL queries
    pub fn limit(&self) -> u32 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as u32;
        PaginatedResponse {
            data,
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

// =============================================================================
// Execution core: languages, limits, tasks, results
// =============================================================================

/// Closed set of languages the execution core knows how to compile/run.
///
/// New languages are added here plus one row in `minos`'s compile/run
/// table -- the enum is the single source of truth shared by every crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Cpp,
    C,
    Go,
    Java,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl Language {
    /// The wire/queue-name tag for this language.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Go => "go",
            Language::Java => "java",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "python" => Some(Language::Python),
            "cpp" => Some(Language::Cpp),
            "c" => Some(Language::C),
            "go" => Some(Language::Go),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    /// The name of the `queue:<language>` dispatch queue for this language.
    pub fn queue_name(&self) -> String {
        format!("queue:{}", self.tag())
    }

    /// Whether this language requires a compile step before running.
    pub fn is_compiled(&self) -> bool {
        !matches!(self, Language::Python)
    }
}

/// What kind of execution a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Ad-hoc run against caller-provided test cases, not scored.
    Run,
    /// Scored submission against a problem outside any contest.
    Submit,
    /// Scored submission against a problem inside a contest.
    ContestSubmit,
    /// Validation of a problem's authored reference solution.
    Validate,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Run => write!(f, "run"),
            TaskKind::Submit => write!(f, "submit"),
            TaskKind::ContestSubmit => write!(f, "contest_submit"),
            TaskKind::Validate => write!(f, "validate"),
        }
    }
}

/// Bit-exact lowercase status tags. These are both the per-test-case
/// verdict and, after aggregation, the submission's final status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    WrongAnswer,
    Tle,
    Mle,
    RuntimeError,
    CompilationError,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Accepted => "accepted",
            Status::WrongAnswer => "wrong_answer",
            Status::Tle => "tle",
            Status::Mle => "mle",
            Status::RuntimeError => "runtime_error",
            Status::CompilationError => "compilation_error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Status::Pending),
            "accepted" => Some(Status::Accepted),
            "wrong_answer" => Some(Status::WrongAnswer),
            "tle" => Some(Status::Tle),
            "mle" => Some(Status::Mle),
            "runtime_error" => Some(Status::RuntimeError),
            "compilation_error" => Some(Status::CompilationError),
            _ => None,
        }
    }

    /// True for any status other than `pending` -- i.e. a final verdict.
    pub fn is_final(&self) -> bool {
        !matches!(self, Status::Pending)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared limit constants and derived timing formulas.
pub mod limits {
    pub const DEFAULT_TIME_MS: u64 = 2000;
    pub const DEFAULT_MEM_KB: u64 = 65536;
    pub const MAX_TIME_MS: u64 = 5000;
    pub const MAX_MEM_KB: u64 = 131072;
    pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;
    pub const SAMPLE_INTERVAL_MS: u64 = 10;
    pub const COMPILE_TIMEOUT_SECS: u64 = 10;
    pub const RETRY_BACKOFF_CAP_SECS: u64 = 30;
    pub const POP_TIMEOUT_SECS: u64 = 5;
    pub const QUERY_DEADLINE_SECS: u64 = 5;
    pub const CACHE_TTL_HOURS: u64 = 4;
    pub const KILL_GRACE_MS: u64 = 50;
    pub const COMPILE_STDERR_CAP_BYTES: usize = 4096;

    /// Cap a requested (time_ms, memory_kb) pair at the published maxima.
    pub fn cap(time_ms: u64, memory_kb: u64) -> (u64, u64) {
        (time_ms.min(MAX_TIME_MS), memory_kb.min(MAX_MEM_KB))
    }

    /// `RESULT_TIMEOUT = max_time_limit * (num_cases + 1) + 30s`
    pub fn result_timeout_secs(max_time_limit_ms: u64, num_cases: usize) -> u64 {
        let per_case_secs = max_time_limit_ms.div_ceil(1000);
        per_case_secs * (num_cases as u64 + 1) + 30
    }
}

/// A single test case: input bytes plus the reference output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub input: Vec<u8>,
    /// Reference output. Callers should have already stripped trailing
    /// whitespace; the runner strips again defensively before comparing.
    pub expected_output: Vec<u8>,
}

/// Task published to a `queue:<language>` dispatch queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTask {
    pub submission_id: SubmissionId,
    pub language: Language,
    pub source: Vec<u8>,
    pub test_cases: Vec<TestCase>,
    pub time_limit_ms: u64,
    pub memory_limit_kb: u64,
    pub kind: TaskKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<ContestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<ProblemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<i64>,
}

/// Outcome of running one test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub index: usize,
    pub status: Status,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Vec<u8>>,
    pub runtime_ms: u64,
    pub peak_memory_kb: u64,
}

/// Result published to `queue:results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub submission_id: SubmissionId,
    pub kind: TaskKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    pub per_case: Vec<TestCaseResult>,
    pub aggregate_status: Status,
    pub max_runtime_ms: u64,
    pub max_memory_kb: u64,
}

impl ExecutionResult {
    /// The first non-accepted per-case status becomes the aggregate, or
    /// `accepted` if every case passed.
    pub fn aggregate(per_case: &[TestCaseResult]) -> Status {
        per_case
            .iter()
            .find(|c| c.status != Status::Accepted)
            .map(|c| c.status)
            .unwrap_or(Status::Accepted)
    }

    /// Index (1-based test case number) of the first non-accepted case,
    /// used to build the submission's user-facing message.
    pub fn first_failure(per_case: &[TestCaseResult]) -> Option<(usize, Status)> {
        per_case
            .iter()
            .find(|c| c.status != Status::Accepted)
            .map(|c| (c.index, c.status))
    }
}

/// A submission as tracked by the Submission Coordinator.
/// Created `pending`, mutated exactly once to a final status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<ProblemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<ContestId>,
    pub language: Language,
    pub code: String,
    pub kind: TaskKind,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub per_case_results: Vec<TestCaseResult>,
}

/// Recorded the first (and only) time a user's contest submission for a
/// given problem is accepted while the points cache has a live entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestSolvedFact {
    pub contest_id: ContestId,
    pub user_id: UserId,
    pub problem_id: ProblemId,
    pub solved_at: chrono::DateTime<chrono::Utc>,
    pub awarded_points: i64,
}
