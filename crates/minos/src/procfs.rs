//! Peak-RSS sampling via `/proc/<pid>/status`.
//!
//! Grounded in the reference implementation's `getMemoryUsage(pid)`, which
//! reads the same file and line. If the file is missing or the `VmRSS:`
//! line can't be parsed -- most commonly because the child has already
//! exited and its `/proc` entry was torn down -- the sample is skipped
//! rather than treated as a zero reading, so a fast-exiting process never
//! produces a false MLE.

use std::path::Path;

/// Read the current resident set size of `pid`, in kilobytes.
///
/// Returns `None` when the sample can't be taken (process gone, unreadable
/// file, unexpected format) -- callers must treat this as "skip this
/// sample", never as "zero memory used".
pub fn read_rss_kb(pid: u32) -> Option<u64> {
    let path = format!("/proc/{pid}/status");
    read_rss_kb_from(Path::new(&path))
}

fn read_rss_kb_from(path: &Path) -> Option<u64> {
    let contents = std::fs::read_to_string(path).ok()?;
    parse_vm_rss(&contents)
}

fn parse_vm_rss(status: &str) -> Option<u64> {
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let digits: String = rest.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return None;
            }
            return digits.parse::<u64>().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vm_rss_line() {
        let status = "Name:\tmain\nVmPeak:\t   12345 kB\nVmRSS:\t    4096 kB\nThreads:\t1\n";
        assert_eq!(parse_vm_rss(status), Some(4096));
    }

    #[test]
    fn missing_line_returns_none() {
        let status = "Name:\tmain\nThreads:\t1\n";
        assert_eq!(parse_vm_rss(status), None);
    }

    #[test]
    fn malformed_value_returns_none() {
        let status = "VmRSS:\t  not-a-number kB\n";
        assert_eq!(parse_vm_rss(status), None);
    }

    #[test]
    fn unreadable_pid_returns_none() {
        // pid 0 never has a /proc entry of its own.
        assert_eq!(read_rss_kb(0), None);
    }
}
