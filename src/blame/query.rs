use tracing::debug;

use super::replay::blame;
use super::types::BlameResult;
use crate::config::BlameConfig;
use crate::error::{BlameError, Result};
use crate::history::{FileHistory, GitHistory};

/// Blame queries against an ingested history.
#[derive(Debug, Clone)]
pub struct BlameQuery<'h> {
    history: &'h GitHistory,
    config: BlameConfig,
}

impl<'h> BlameQuery<'h> {
    pub fn new(history: &'h GitHistory) -> Self {
        BlameQuery {
            history,
            config: BlameConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BlameConfig) -> Self {
        self.config = config;
        self
    }

    fn file_history(&self, path: &str) -> Result<&'h FileHistory> {
        self.history
            .file_history(path)
            .ok_or_else(|| BlameError::PathNotFound(path.to_string()))
    }

    /// Blame around one of the commits that touched `path`.
    ///
    /// `blame_vector` describes the file just before `commit` (the version its
    /// hunks apply to) and `future_vector` the file just after it, so removed
    /// lines can be shown with their previous owners and added lines with the
    /// commits that will later change them. The commit's hunks are returned
    /// alongside.
    pub fn diff_blame(&self, commit: &str, path: &str) -> Result<BlameResult> {
        let file = self.file_history(path)?;
        let index = file
            .iter()
            .position(|c| c.hash == commit)
            .ok_or_else(|| BlameError::NotTouched {
                path: path.to_string(),
                commit: commit.to_string(),
            })?;

        debug!(path, commit, index, "diff blame");
        let (blame_vector, future_vector) = blame(file, index, index + 1, &self.config)?;

        Ok(BlameResult {
            blame_vector,
            future_vector,
            previous_commit_hash: neighbor(file, index.checked_sub(1)),
            next_commit_hash: neighbor(file, Some(index + 1)),
            hunks: file[index].hunks.clone(),
        })
    }

    /// Blame of `path` as it stood right after `commit`, which may be any
    /// commit in the history, touching the file or not.
    ///
    /// The anchor is the last commit touching `path` at or before `commit`;
    /// both vectors describe the file version that commit produced.
    /// `previous_commit_hash` and `next_commit_hash` are the anchor commit's
    /// neighbours in the file's history.
    pub fn file_blame(&self, commit: &str, path: &str) -> Result<BlameResult> {
        let file = self.file_history(path)?;
        let count = self.commits_touching_until(file, commit)?;
        if count == 0 {
            return Err(BlameError::NotPresent {
                path: path.to_string(),
                commit: commit.to_string(),
            });
        }

        debug!(path, commit, anchor = count, "file blame");
        let (blame_vector, future_vector) = blame(file, count, count, &self.config)?;

        let anchor = count - 1;
        Ok(BlameResult {
            blame_vector,
            future_vector,
            previous_commit_hash: neighbor(file, anchor.checked_sub(1)),
            next_commit_hash: neighbor(file, Some(anchor + 1)),
            hunks: Vec::new(),
        })
    }

    /// Number of `file` commits at or before `commit` in the global order.
    fn commits_touching_until(&self, file: &FileHistory, commit: &str) -> Result<usize> {
        let mut count = 0;
        for hash in self.history.commit_hashes() {
            if file.get(count).map_or(false, |c| c.hash == *hash) {
                count += 1;
            }
            if hash == commit {
                return Ok(count);
            }
        }
        Err(BlameError::CommitNotFound(commit.to_string()))
    }
}

fn neighbor(file: &FileHistory, index: Option<usize>) -> Option<String> {
    index.and_then(|i| file.get(i)).map(|c| c.hash.clone())
}

impl GitHistory {
    /// [`BlameQuery::diff_blame`] with the default config.
    pub fn diff_blame(&self, commit: &str, path: &str) -> Result<BlameResult> {
        BlameQuery::new(self).diff_blame(commit, path)
    }

    /// [`BlameQuery::file_blame`] with the default config.
    pub fn file_blame(&self, commit: &str, path: &str) -> Result<BlameResult> {
        BlameQuery::new(self).file_blame(commit, path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::blame::types::BlameVector;
    use crate::history::parser::tests::SAMPLE_LOG;
    use crate::history::{parse_git_log, FileCommit, Hunk};

    const C1: &str = "b9a26a4383eb51c1";
    const C2: &str = "b0539826eadc3feb";
    const C3: &str = "42838bca4ba13c3f";

    fn sample() -> GitHistory {
        parse_git_log(SAMPLE_LOG, &BlameConfig::default()).unwrap()
    }

    fn hashes(vector: &BlameVector) -> Vec<&str> {
        vector
            .iter()
            .map(|l| l.commit_hash.as_deref().unwrap_or(""))
            .collect()
    }

    /// `a.txt` is created by x1, untouched by x2, edited by x3; `b.txt` only
    /// appears in x2.
    fn interleaved() -> GitHistory {
        let mut files = HashMap::new();
        files.insert(
            "a.txt".to_string(),
            vec![
                FileCommit::new("x1", vec![Hunk::new(0, 0, 1, 2)]),
                FileCommit::new("x3", vec![Hunk::new(2, 0, 3, 1)]),
            ],
        );
        files.insert(
            "b.txt".to_string(),
            vec![FileCommit::new("x2", vec![Hunk::new(0, 0, 1, 1)])],
        );
        let order = ["x0", "x1", "x2", "x3"].iter().map(|h| h.to_string()).collect();
        GitHistory::new(files, order).unwrap()
    }

    #[test]
    fn test_diff_blame_first_commit() {
        let result = sample().diff_blame(C1, "test.txt").unwrap();
        assert!(result.blame_vector.is_empty());
        assert_eq!(hashes(&result.future_vector), vec![C2, C2, C3]);
        assert_eq!(result.previous_commit_hash, None);
        assert_eq!(result.next_commit_hash.as_deref(), Some(C2));
        assert_eq!(result.hunks, vec![Hunk::new(0, 0, 1, 3)]);
    }

    #[test]
    fn test_diff_blame_middle_commit() {
        let result = sample().diff_blame(C2, "test.txt").unwrap();
        assert_eq!(hashes(&result.blame_vector), vec![C1, C1, C1]);
        let numbers: Vec<usize> = result.blame_vector.iter().map(|l| l.line_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        // Post-state: two lines from C2 and one from C1, all deleted by C3.
        assert_eq!(hashes(&result.future_vector), vec![C3, C3, C3]);
        assert_eq!(result.previous_commit_hash.as_deref(), Some(C1));
        assert_eq!(result.next_commit_hash.as_deref(), Some(C3));
        assert_eq!(result.hunks, vec![Hunk::new(1, 2, 1, 2)]);
    }

    #[test]
    fn test_diff_blame_deleting_commit() {
        let result = sample().diff_blame(C3, "test.txt").unwrap();
        assert_eq!(hashes(&result.blame_vector), vec![C2, C2, C1]);
        let numbers: Vec<usize> = result.blame_vector.iter().map(|l| l.line_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(result.future_vector.iter().all(|l| l.commit_hash.is_none()));
        assert!(result.future_vector.is_empty());
        assert_eq!(result.previous_commit_hash.as_deref(), Some(C2));
        assert_eq!(result.next_commit_hash, None);
    }

    #[test]
    fn test_file_blame_after_each_commit() {
        let history = sample();

        let first = history.file_blame(C1, "test.txt").unwrap();
        assert_eq!(hashes(&first.blame_vector), vec![C1, C1, C1]);
        assert_eq!(hashes(&first.future_vector), vec![C2, C2, C3]);
        assert_eq!(first.previous_commit_hash, None);
        assert_eq!(first.next_commit_hash.as_deref(), Some(C2));
        assert!(first.hunks.is_empty());

        let second = history.file_blame(C2, "test.txt").unwrap();
        assert_eq!(hashes(&second.blame_vector), vec![C2, C2, C1]);
        assert_eq!(hashes(&second.future_vector), vec![C3, C3, C3]);

        let third = history.file_blame(C3, "test.txt").unwrap();
        assert!(third.blame_vector.is_empty());
        assert!(third.future_vector.is_empty());
        assert_eq!(third.previous_commit_hash.as_deref(), Some(C2));
        assert_eq!(third.next_commit_hash, None);
    }

    #[test]
    fn test_missing_path() {
        let err = sample().diff_blame(C1, "missing.txt").unwrap_err();
        assert!(matches!(err, BlameError::PathNotFound(ref p) if p == "missing.txt"));
        let err = sample().file_blame(C1, "missing.txt").unwrap_err();
        assert_eq!(err.kind(), "notFound");
    }

    #[test]
    fn test_commit_not_touching_path() {
        let err = interleaved().diff_blame("x2", "a.txt").unwrap_err();
        assert!(matches!(err, BlameError::NotTouched { .. }));
        assert_eq!(err.kind(), "notTouched");
    }

    #[test]
    fn test_unknown_commit() {
        let err = sample().file_blame("deadbeefdeadbeef", "test.txt").unwrap_err();
        assert!(matches!(err, BlameError::CommitNotFound(_)));
    }

    #[test]
    fn test_file_not_present_yet() {
        let history = interleaved();
        let err = history.file_blame("x0", "a.txt").unwrap_err();
        assert_eq!(err.kind(), "notPresent");
        let err = history.file_blame("x1", "b.txt").unwrap_err();
        assert!(matches!(err, BlameError::NotPresent { .. }));
    }

    #[test]
    fn test_file_blame_at_untouching_commit() {
        let result = interleaved().file_blame("x2", "a.txt").unwrap();
        assert_eq!(hashes(&result.blame_vector), vec!["x1", "x1"]);
        // x3 inserts after line 2 and touches neither existing line.
        assert_eq!(hashes(&result.future_vector), vec!["", ""]);
        assert_eq!(result.previous_commit_hash, None);
        assert_eq!(result.next_commit_hash.as_deref(), Some("x3"));
    }

    #[test]
    fn test_query_config_limits() {
        let history = sample();
        let config = BlameConfig {
            max_lines: 2,
            ..BlameConfig::default()
        };
        let err = BlameQuery::new(&history)
            .with_config(config)
            .diff_blame(C2, "test.txt")
            .unwrap_err();
        assert_eq!(err.kind(), "resourceLimit");
    }
}
