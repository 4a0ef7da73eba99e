//! Test-case Runner.
//!
//! Spawns a child process with stdin pre-loaded, polls its resident set
//! size and wall-clock elapsed time on a fixed cadence, and force-kills it
//! the instant either limit is crossed. The actual wait/poll loop runs on
//! a blocking thread (`spawn_blocking`) since it drives raw `waitpid`
//! polling and `/proc` reads that have no async equivalent worth chasing.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use olympus_common::{limits, Status, TestCase, TestCaseResult};

use crate::procfs;

/// One test case's inputs to the runner, decoupled from the wire `TestCase`
/// type so unit tests can construct cases inline.
pub struct RunSpec<'a> {
    pub index: usize,
    pub input: &'a [u8],
    pub expected_output: &'a [u8],
    pub time_limit_ms: u64,
    pub memory_limit_kb: u64,
}

impl RunSpec<'_> {
    pub fn from_test_case(index: usize, tc: &TestCase, time_limit_ms: u64, memory_limit_kb: u64) -> RunSpec<'_> {
        RunSpec {
            index,
            input: &tc.input,
            expected_output: &tc.expected_output,
            time_limit_ms,
            memory_limit_kb,
        }
    }
}

/// Run `argv` (program + args) against one test case, inside `cwd`.
pub async fn run_test_case(
    argv: Vec<String>,
    cwd: std::path::PathBuf,
    spec_index: usize,
    input: Vec<u8>,
    expected_output: Vec<u8>,
    time_limit_ms: u64,
    memory_limit_kb: u64,
) -> TestCaseResult {
    tokio::task::spawn_blocking(move || {
        run_test_case_blocking(&argv, &cwd, spec_index, &input, &expected_output, time_limit_ms, memory_limit_kb)
    })
    .await
    .unwrap_or_else(|e| TestCaseResult {
        index: spec_index,
        status: Status::RuntimeError,
        stdout: Vec::new(),
        stderr: format!("runner task panicked: {e}").into_bytes(),
        expected: None,
        runtime_ms: 0,
        peak_memory_kb: 0,
    })
}

enum StopReason {
    Exited(std::process::ExitStatus),
    Tle,
    Mle,
}

fn run_test_case_blocking(
    argv: &[String],
    cwd: &std::path::Path,
    index: usize,
    input: &[u8],
    expected_output: &[u8],
    time_limit_ms: u64,
    memory_limit_kb: u64,
) -> TestCaseResult {
    let (program, args) = match argv.split_first() {
        Some(pair) => pair,
        None => {
            return TestCaseResult {
                index,
                status: Status::RuntimeError,
                stdout: Vec::new(),
                stderr: b"empty argv".to_vec(),
                expected: None,
                runtime_ms: 0,
                peak_memory_kb: 0,
            }
        }
    };

    let mut child = match Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => {
            return TestCaseResult {
                index,
                status: Status::RuntimeError,
                stdout: Vec::new(),
                stderr: format!("failed to spawn: {e}").into_bytes(),
                expected: None,
                runtime_ms: 0,
                peak_memory_kb: 0,
            }
        }
    };

    write_stdin(&mut child, input);
    let (stdout_rx, stderr_rx) = spawn_readers(&mut child);

    let t_start = Instant::now();
    let mut peak_memory_kb: u64 = 0;
    let pid = child.id();

    let stop = loop {
        if let Some(rss) = procfs::read_rss_kb(pid) {
            peak_memory_kb = peak_memory_kb.max(rss);
            if rss > memory_limit_kb {
                force_kill(pid);
                break StopReason::Mle;
            }
        }

        if t_start.elapsed().as_millis() as u64 > time_limit_ms {
            force_kill(pid);
            break StopReason::Tle;
        }

        match child.try_wait() {
            Ok(Some(status)) => break StopReason::Exited(status),
            Ok(None) => {}
            Err(_) => {}
        }

        std::thread::sleep(Duration::from_millis(limits::SAMPLE_INTERVAL_MS));
    };

    let elapsed_ms = t_start.elapsed().as_millis() as u64;
    let runtime_ms = elapsed_ms.min(time_limit_ms);

    let stdout = drain(stdout_rx);
    let stderr = drain(stderr_rx);

    let status = match stop {
        StopReason::Mle => Status::Mle,
        StopReason::Tle => Status::Tle,
        StopReason::Exited(exit_status) => {
            if !exit_status.success() {
                Status::RuntimeError
            } else if expected_output.len() > limits::MAX_OUTPUT_BYTES {
                Status::WrongAnswer
            } else if strip_trailing_ws(&stdout) == strip_trailing_ws(expected_output) {
                Status::Accepted
            } else {
                Status::WrongAnswer
            }
        }
    };

    TestCaseResult {
        index,
        status,
        stdout,
        stderr,
        expected: Some(expected_output.to_vec()),
        runtime_ms,
        peak_memory_kb,
    }
}

fn write_stdin(child: &mut Child, input: &[u8]) {
    if let Some(mut stdin) = child.stdin.take() {
        let input = input.to_vec();
        // Writing on a dedicated thread avoids deadlocking against a child
        // that starts emitting output before it has consumed all of stdin.
        std::thread::spawn(move || {
            let _ = stdin.write_all(&input);
        });
    }
}

fn spawn_readers(
    child: &mut Child,
) -> (
    std::sync::mpsc::Receiver<Vec<u8>>,
    std::sync::mpsc::Receiver<Vec<u8>>,
) {
    let (stdout_tx, stdout_rx) = std::sync::mpsc::channel();
    let (stderr_tx, stderr_rx) = std::sync::mpsc::channel();

    if let Some(mut stdout) = child.stdout.take() {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = read_capped(&mut stdout, &mut buf, limits::MAX_OUTPUT_BYTES);
            let _ = stdout_tx.send(buf);
        });
    } else {
        let _ = stdout_tx.send(Vec::new());
    }

    if let Some(mut stderr) = child.stderr.take() {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = read_capped(&mut stderr, &mut buf, limits::MAX_OUTPUT_BYTES);
            let _ = stderr_tx.send(buf);
        });
    } else {
        let _ = stderr_tx.send(Vec::new());
    }

    (stdout_rx, stderr_rx)
}

/// Read from `r` into `buf` up to `cap` bytes, but keep draining the pipe
/// past the cap (discarding the overflow) so the child never blocks
/// writing to a full pipe buffer.
fn read_capped(r: &mut impl Read, buf: &mut Vec<u8>, cap: usize) -> std::io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = r.read(&mut chunk)?;
        if n == 0 {
            return Ok(());
        }
        if buf.len() < cap {
            let take = (cap - buf.len()).min(n);
            buf.extend_from_slice(&chunk[..take]);
        }
    }
}

fn drain(rx: std::sync::mpsc::Receiver<Vec<u8>>) -> Vec<u8> {
    rx.recv_timeout(Duration::from_secs(2)).unwrap_or_default()
}

fn force_kill(pid: u32) {
    let pid = Pid::from_raw(pid as i32);
    let _ = kill(pid, Signal::SIGTERM);

    let deadline = Instant::now() + Duration::from_millis(limits::KILL_GRACE_MS);
    while Instant::now() < deadline {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => std::thread::sleep(Duration::from_millis(5)),
            _ => return,
        }
    }
    let _ = kill(pid, Signal::SIGKILL);
    let _ = waitpid(pid, None);
}

/// Strip trailing whitespace (spaces, tabs, CR, LF) from the end of the
/// buffer -- comparison is byte-exact.
pub fn strip_trailing_ws(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b' ' | b'\t' | b'\r' | b'\n') {
        end -= 1;
    }
    &buf[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_whitespace_only() {
        assert_eq!(strip_trailing_ws(b"hello\n"), b"hello");
        assert_eq!(strip_trailing_ws(b"hello \t\r\n"), b"hello");
        assert_eq!(strip_trailing_ws(b"  hello  "), b"  hello");
        assert_eq!(strip_trailing_ws(b""), b"");
    }

    #[tokio::test]
    async fn accepted_echo_via_cat() {
        let result = run_test_case(
            vec!["cat".to_string()],
            std::env::temp_dir(),
            0,
            b"5\n".to_vec(),
            b"5".to_vec(),
            2000,
            65536,
        )
        .await;
        assert_eq!(result.status, Status::Accepted);
    }

    #[tokio::test]
    async fn wrong_answer_on_mismatch() {
        let result = run_test_case(
            vec!["cat".to_string()],
            std::env::temp_dir(),
            0,
            b"5\n".to_vec(),
            b"6".to_vec(),
            2000,
            65536,
        )
        .await;
        assert_eq!(result.status, Status::WrongAnswer);
    }

    #[tokio::test]
    async fn time_limit_exceeded_is_killed() {
        let result = run_test_case(
            vec!["sleep".to_string(), "5".to_string()],
            std::env::temp_dir(),
            0,
            Vec::new(),
            Vec::new(),
            200,
            65536,
        )
        .await;
        assert_eq!(result.status, Status::Tle);
        assert!(result.runtime_ms <= 200);
    }

    #[tokio::test]
    async fn nonzero_exit_is_runtime_error() {
        let result = run_test_case(
            vec!["false".to_string()],
            std::env::temp_dir(),
            0,
            Vec::new(),
            Vec::new(),
            2000,
            65536,
        )
        .await;
        assert_eq!(result.status, Status::RuntimeError);
    }
}
