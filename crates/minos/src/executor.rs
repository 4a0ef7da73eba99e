//! Language Executor.
//!
//! Owns the per-language compile/run table, the per-task scratch
//! directory, and the per-test-case loop over `runner::run_test_case`.
//! Per-case failures never short-circuit the loop -- every test case is
//! always run, which is the one deliberate divergence from how this table
//! used to be driven (`sisyphus::compiler::Compiler::get_compile_command`
//! stopped at the first failing case).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use olympus_common::{limits, ExecutionResult, ExecutionTask, Language, Status, TestCaseResult};
use tokio::fs;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::runner;

/// One language's build: the source filename, the compile argv (empty for
/// interpreted languages), and the run argv. Table-driven the same way
/// `sisyphus::compiler::Compiler::get_compile_command` dispatched, but
/// closed over the five-language enumeration.
struct LangSpec {
    source_file: &'static str,
    compile_argv: Option<&'static [&'static str]>,
    run_argv: &'static [&'static str],
}

fn lang_spec(language: Language) -> LangSpec {
    match language {
        Language::Python => LangSpec {
            source_file: "main.py",
            compile_argv: None,
            run_argv: &["python3", "main.py"],
        },
        Language::Cpp => LangSpec {
            source_file: "main.cpp",
            compile_argv: Some(&["g++", "-O2", "-std=c++17", "main.cpp", "-o", "main"]),
            run_argv: &["./main"],
        },
        Language::C => LangSpec {
            source_file: "main.c",
            compile_argv: Some(&["gcc", "-O2", "main.c", "-o", "main"]),
            run_argv: &["./main"],
        },
        Language::Go => LangSpec {
            source_file: "main.go",
            compile_argv: Some(&["go", "build", "-o", "main", "main.go"]),
            run_argv: &["./main"],
        },
        Language::Java => LangSpec {
            source_file: "Main.java",
            compile_argv: Some(&["javac", "Main.java"]),
            run_argv: &["java", "Main"],
        },
    }
}

pub struct Executor {
    scratch_root: PathBuf,
}

impl Executor {
    pub fn new(scratch_root: PathBuf) -> Self {
        Self { scratch_root }
    }

    /// Execute one `ExecutionTask` end to end: compile (if needed), then
    /// run every test case in order, continuing past per-case failures.
    pub async fn execute(&self, task: &ExecutionTask) -> ExecutionResult {
        let spec = lang_spec(task.language);
        let work_dir = self.scratch_root.join(task.submission_id.to_string());

        let result = self.execute_inner(task, &spec, &work_dir).await;

        if let Err(e) = fs::remove_dir_all(&work_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(submission_id = %task.submission_id, error = %e, "failed to clean up scratch dir");
            }
        }

        result
    }

    async fn execute_inner(
        &self,
        task: &ExecutionTask,
        spec: &LangSpec,
        work_dir: &Path,
    ) -> ExecutionResult {
        if let Err(e) = fs::create_dir_all(work_dir).await {
            return compilation_error(task, format!("failed to create scratch directory: {e}"));
        }

        if let Err(e) = fs::write(work_dir.join(spec.source_file), &task.source).await {
            return compilation_error(task, format!("failed to write source file: {e}"));
        }

        if let Some(compile_argv) = spec.compile_argv {
            if let Err(message) = compile(compile_argv, work_dir).await {
                return compilation_error(task, message);
            }
        }

        let mut per_case = Vec::with_capacity(task.test_cases.len());
        for (i, tc) in task.test_cases.iter().enumerate() {
            let index = i + 1;
            let argv: Vec<String> = spec.run_argv.iter().map(|s| s.to_string()).collect();
            let result = runner::run_test_case(
                argv,
                work_dir.to_path_buf(),
                index,
                tc.input.clone(),
                tc.expected_output.clone(),
                task.time_limit_ms,
                task.memory_limit_kb,
            )
            .await;
            per_case.push(result);
        }

        let aggregate_status = ExecutionResult::aggregate(&per_case);
        let max_runtime_ms = per_case.iter().map(|c| c.runtime_ms).max().unwrap_or(0);
        let max_memory_kb = per_case.iter().map(|c| c.peak_memory_kb).max().unwrap_or(0);

        ExecutionResult {
            submission_id: task.submission_id,
            kind: task.kind,
            context: build_context(task),
            per_case,
            aggregate_status,
            max_runtime_ms,
            max_memory_kb,
        }
    }
}

async fn compile(argv: &[&str], work_dir: &Path) -> Result<(), String> {
    let (program, args) = argv.split_first().expect("compile argv is non-empty");

    let child = Command::new(program)
        .args(args)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to launch compiler: {e}"))?;

    let outcome = timeout(
        Duration::from_secs(limits::COMPILE_TIMEOUT_SECS),
        child.wait_with_output(),
    )
    .await;

    match outcome {
        Ok(Ok(output)) if output.status.success() => Ok(()),
        Ok(Ok(output)) => {
            let mut stderr = output.stderr;
            stderr.truncate(limits::COMPILE_STDERR_CAP_BYTES);
            Err(String::from_utf8_lossy(&stderr).into_owned())
        }
        Ok(Err(e)) => Err(format!("compiler process error: {e}")),
        Err(_) => Err("compilation timed out".to_string()),
    }
}

/// Build the synthetic compilation_error result: a single per-case entry
/// carrying the compiler's stderr, with every remaining test case skipped.
fn compilation_error(task: &ExecutionTask, message: String) -> ExecutionResult {
    let mut stderr = message.into_bytes();
    stderr.truncate(limits::COMPILE_STDERR_CAP_BYTES);

    let synthetic = TestCaseResult {
        index: 0,
        status: Status::CompilationError,
        stdout: Vec::new(),
        stderr,
        expected: None,
        runtime_ms: 0,
        peak_memory_kb: 0,
    };

    ExecutionResult {
        submission_id: task.submission_id,
        kind: task.kind,
        context: build_context(task),
        per_case: vec![synthetic],
        aggregate_status: Status::CompilationError,
        max_runtime_ms: 0,
        max_memory_kb: 0,
    }
}

fn build_context(task: &ExecutionTask) -> Option<serde_json::Value> {
    if task.contest_id.is_none() && task.problem_id.is_none() {
        return None;
    }
    Some(serde_json::json!({
        "contest_id": task.contest_id,
        "problem_id": task.problem_id,
        "points": task.points,
        "penalty": task.penalty,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use olympus_common::TaskKind;
    use uuid::Uuid;

    fn base_task(language: Language, source: &str) -> ExecutionTask {
        ExecutionTask {
            submission_id: Uuid::new_v4(),
            language,
            source: source.as_bytes().to_vec(),
            test_cases: vec![olympus_common::TestCase {
                id: 1,
                input: b"".to_vec(),
                expected_output: b"hi\n".to_vec(),
            }],
            time_limit_ms: 2000,
            memory_limit_kb: 65536,
            kind: TaskKind::Run,
            contest_id: None,
            problem_id: None,
            points: None,
            penalty: None,
        }
    }

    #[tokio::test]
    async fn python_accepted() {
        let task = base_task(Language::Python, "print('hi')\n");
        let executor = Executor::new(std::env::temp_dir().join("minos-exec-test"));
        let result = executor.execute(&task).await;
        assert_eq!(result.aggregate_status, Status::Accepted);
    }

    #[tokio::test]
    async fn continues_after_first_case_fails() {
        let mut task = base_task(Language::Python, "print('nope')\n");
        task.test_cases.push(olympus_common::TestCase {
            id: 2,
            input: b"".to_vec(),
            expected_output: b"nope\n".to_vec(),
        });
        let executor = Executor::new(std::env::temp_dir().join("minos-exec-test2"));
        let result = executor.execute(&task).await;
        assert_eq!(result.per_case.len(), 2);
        assert_eq!(result.per_case[0].status, Status::WrongAnswer);
        assert_eq!(result.per_case[1].status, Status::Accepted);
        assert_eq!(result.aggregate_status, Status::WrongAnswer);
    }
}
