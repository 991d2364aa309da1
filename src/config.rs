use serde::{Deserialize, Serialize};

use crate::error::{BlameError, Result};

/// Ingestion and query settings.
///
/// A limit of 0 disables that guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlameConfig {
    /// Number of leading hash characters kept from `commit <hash>` lines.
    pub hash_length: usize,
    /// Maximum number of lines a file may reach during a replay.
    pub max_lines: usize,
    /// Maximum number of commit replays a single query may perform.
    pub max_commits: usize,
}

impl Default for BlameConfig {
    fn default() -> Self {
        BlameConfig {
            hash_length: 16,
            max_lines: 2_000_000,
            max_commits: 500_000,
        }
    }
}

impl BlameConfig {
    /// Parse a config from JSON. Missing fields keep their defaults and an
    /// empty string yields the default config.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(BlameError::from)
    }

    pub(crate) fn check_lines(&self, lines: usize) -> Result<()> {
        if self.max_lines != 0 && lines > self.max_lines {
            return Err(BlameError::ResourceLimit {
                resource: "line",
                limit: self.max_lines,
            });
        }
        Ok(())
    }

    pub(crate) fn check_commits(&self, commits: usize) -> Result<()> {
        if self.max_commits != 0 && commits > self.max_commits {
            return Err(BlameError::ResourceLimit {
                resource: "commit",
                limit: self.max_commits,
            });
        }
        Ok(())
    }
}
