use thiserror::Error;

/// Errors returned by ingestion and blame queries.
#[derive(Debug, Error)]
pub enum BlameError {
    #[error("no such file: {0}")]
    PathNotFound(String),

    #[error("no such commit: {0}")]
    CommitNotFound(String),

    #[error("file {path} is never touched by commit {commit}")]
    NotTouched { path: String, commit: String },

    #[error("file {path} does not exist at commit {commit}")]
    NotPresent { path: String, commit: String },

    #[error("{resource} limit of {limit} exceeded")]
    ResourceLimit { resource: &'static str, limit: usize },

    #[error("hunk of commit {commit} reaches old line {line}, past the end of the file")]
    HunkOutOfRange { commit: String, line: usize },

    #[error("history of {path} is not in commit order at {commit}")]
    HistoryOutOfOrder { path: String, commit: String },

    #[error("hunks of commit {commit} on {path} overlap or are out of order")]
    UnorderedHunks { path: String, commit: String },

    #[error("malformed git log at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid JSON: {0}")]
    Config(#[from] serde_json::Error),
}

impl BlameError {
    /// Stable tag for the error variant, used by the JSON surface.
    pub fn kind(&self) -> &'static str {
        match self {
            BlameError::PathNotFound(_) | BlameError::CommitNotFound(_) => "notFound",
            BlameError::NotTouched { .. } => "notTouched",
            BlameError::NotPresent { .. } => "notPresent",
            BlameError::ResourceLimit { .. } => "resourceLimit",
            BlameError::HunkOutOfRange { .. }
            | BlameError::HistoryOutOfOrder { .. }
            | BlameError::UnorderedHunks { .. } => "inconsistentHistory",
            BlameError::Parse { .. } => "parse",
            BlameError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, BlameError>;
