use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{BlameError, Result};

/// A `-U0` diff hunk header, with 1-based line positions.
///
/// A zero length marks a pure insertion (after line `old_start`) or a pure
/// deletion (after line `new_start`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    pub old_start: usize,
    pub old_length: usize,
    pub new_start: usize,
    pub new_length: usize,
}

impl Hunk {
    pub fn new(old_start: usize, old_length: usize, new_start: usize, new_length: usize) -> Self {
        Hunk {
            old_start,
            old_length,
            new_start,
            new_length,
        }
    }

    /// The same hunk seen from the other side: an insertion becomes a deletion.
    pub fn reversed(&self) -> Hunk {
        Hunk {
            old_start: self.new_start,
            old_length: self.new_length,
            new_start: self.old_start,
            new_length: self.old_length,
        }
    }

    /// First old line after the hunk, `None` if it does not fit in `usize`.
    pub(crate) fn old_end(&self) -> Option<usize> {
        self.old_start.checked_add(self.old_length)
    }

    pub(crate) fn new_end(&self) -> Option<usize> {
        self.new_start.checked_add(self.new_length)
    }

    /// Number of `-`/`+` content lines following the hunk header.
    pub(crate) fn content_lines(&self) -> Option<usize> {
        self.old_length.checked_add(self.new_length)
    }
}

/// The hunks one commit applied to one path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileCommit {
    pub hash: String,
    pub hunks: Vec<Hunk>,
}

impl FileCommit {
    pub fn new(hash: impl Into<String>, hunks: Vec<Hunk>) -> Self {
        FileCommit {
            hash: hash.into(),
            hunks,
        }
    }
}

/// Commits touching one path, oldest first.
pub type FileHistory = Vec<FileCommit>;

/// Per-path histories plus the global commit order they were taken from.
///
/// Only constructible through [`GitHistory::new`] (or deserialization, which
/// goes through it), so every instance satisfies the ordering checks there.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawGitHistory")]
pub struct GitHistory {
    file_histories: HashMap<String, FileHistory>,
    commit_hashes: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGitHistory {
    file_histories: HashMap<String, FileHistory>,
    commit_hashes: Vec<String>,
}

impl TryFrom<RawGitHistory> for GitHistory {
    type Error = BlameError;

    fn try_from(raw: RawGitHistory) -> Result<Self> {
        GitHistory::new(raw.file_histories, raw.commit_hashes)
    }
}

impl GitHistory {
    /// Build a history, checking that every path's commits appear in
    /// `commit_hashes` in the same relative order and that each commit's hunks
    /// are ascending and non-overlapping.
    pub fn new(
        file_histories: HashMap<String, FileHistory>,
        commit_hashes: Vec<String>,
    ) -> Result<Self> {
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(commit_hashes.len());
        for (i, hash) in commit_hashes.iter().enumerate() {
            positions.entry(hash.as_str()).or_insert(i);
        }

        for (path, history) in &file_histories {
            let mut last: Option<usize> = None;
            for commit in history {
                let position = match positions.get(commit.hash.as_str()) {
                    Some(&p) if last.map_or(true, |l| p > l) => p,
                    _ => {
                        return Err(BlameError::HistoryOutOfOrder {
                            path: path.clone(),
                            commit: commit.hash.clone(),
                        })
                    }
                };
                last = Some(position);
                check_hunk_order(path, commit)?;
            }
        }

        Ok(GitHistory {
            file_histories,
            commit_hashes,
        })
    }

    pub fn file_history(&self, path: &str) -> Option<&FileHistory> {
        self.file_histories.get(path)
    }

    pub fn file_histories(&self) -> &HashMap<String, FileHistory> {
        &self.file_histories
    }

    pub fn commit_hashes(&self) -> &[String] {
        &self.commit_hashes
    }

    /// Paths with at least one recorded commit, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.file_histories.keys().map(|p| p.as_str()).collect();
        paths.sort_unstable();
        paths
    }
}

fn check_hunk_order(path: &str, commit: &FileCommit) -> Result<()> {
    let unordered = || BlameError::UnorderedHunks {
        path: path.to_string(),
        commit: commit.hash.clone(),
    };
    let mut last_end: Option<(usize, usize)> = None;
    for hunk in &commit.hunks {
        if let Some((old_end, new_end)) = last_end {
            if hunk.old_start < old_end || hunk.new_start < new_end {
                return Err(unordered());
            }
        }
        match (hunk.old_end(), hunk.new_end()) {
            (Some(old_end), Some(new_end)) => last_end = Some((old_end, new_end)),
            _ => return Err(unordered()),
        }
    }
    Ok(())
}
