//! Example rule implementations.
//!
//! These demonstrate how to create specifications for various contexts.

use crate::context::FileContext;
use crate::specification::Specification;
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// File-based rules for Horus (Cleaner)
// =============================================================================

/// Check if the file/directory was last accessed more than N hours ago.
pub struct LastAccessOlderThan {
    pub hours: u64,
}

impl LastAccessOlderThan {
    pub fn new(hours: u64) -> Self {
        Self { hours }
    }
}

#[async_trait]
impl Specification<FileContext> for LastAccessOlderThan {
    async fn is_satisfied_by(&self, ctx: &FileContext) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let age_hours = (now - ctx.accessed_at) / 3600;
        age_hours > self.hours as i64
    }
}

/// Check if the file/directory was created more than N hours ago.
pub struct CreatedOlderThan {
    pub hours: u64,
}

impl CreatedOlderThan {
    pub fn new(hours: u64) -> Self {
        Self { hours }
    }
}

#[async_trait]
impl Specification<FileContext> for CreatedOlderThan {
    async fn is_satisfied_by(&self, ctx: &FileContext) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let age_hours = (now - ctx.created_at) / 3600;
        age_hours > self.hours as i64
    }
}

/// Check if the path is a file.
pub struct IsFile;

#[async_trait]
impl Specification<FileContext> for IsFile {
    async fn is_satisfied_by(&self, ctx: &FileContext) -> bool {
        ctx.is_file
    }
}

/// Check if the path is a directory.
pub struct IsDirectory;

#[async_trait]
impl Specification<FileContext> for IsDirectory {
    async fn is_satisfied_by(&self, ctx: &FileContext) -> bool {
        ctx.is_directory
    }
}

/// Check if file size is larger than N bytes.
pub struct SizeLargerThan {
    pub bytes: u64,
}

impl SizeLargerThan {
    pub fn new(bytes: u64) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl Specification<FileContext> for SizeLargerThan {
    async fn is_satisfied_by(&self, ctx: &FileContext) -> bool {
        ctx.size_bytes > self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::Spec;

    fn sample_file_context(accessed_hours_ago: i64) -> FileContext {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        FileContext {
            path: "/mnt/data/testcases/problem1/test1.txt".to_string(),
            is_file: true,
            is_directory: false,
            size_bytes: 1024,
            created_at: now - (accessed_hours_ago * 3600),
            modified_at: now - (accessed_hours_ago * 3600),
            accessed_at: now - (accessed_hours_ago * 3600),
        }
    }

    #[tokio::test]
    async fn test_last_access_older_than() {
        let ctx = sample_file_context(8); // 8 hours ago
        let rule = LastAccessOlderThan::new(6);
        assert!(rule.is_satisfied_by(&ctx).await);

        let ctx = sample_file_context(4); // 4 hours ago
        assert!(!rule.is_satisfied_by(&ctx).await);
    }

    #[tokio::test]
    async fn test_cleanup_rule_composition() {
        let ctx = sample_file_context(8);
        
        // Stale file rule: (accessed > 6 hours ago) AND (is file)
        let rule = Spec(LastAccessOlderThan::new(6)) & Spec(IsFile);
        assert!(rule.is_satisfied_by(&ctx).await);
    }

}
