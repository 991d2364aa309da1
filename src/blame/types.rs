use serde::Serialize;

use crate::history::Hunk;

/// A run of consecutive lines attributed to one commit.
///
/// `line_start` is the line number the first of these lines had in the file
/// version produced by the commit that introduced them, not its current
/// position. `commit_hash` is `None` for lines with no attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameSegment {
    pub line_count: usize,
    pub line_start: usize,
    pub commit_hash: Option<String>,
}

/// Ordered, contiguous segments covering a whole file version.
pub type BlameSegments = Vec<BlameSegment>;

/// Total number of lines covered by `segments`.
pub fn line_total(segments: &[BlameSegment]) -> usize {
    segments.iter().map(|s| s.line_count).sum()
}

/// One unattributed segment spanning the same number of lines as `segments`.
pub fn wipe(segments: &[BlameSegment]) -> BlameSegments {
    vec![BlameSegment {
        line_count: line_total(segments),
        line_start: 1,
        commit_hash: None,
    }]
}

/// Expand segments into one entry per line.
pub fn flatten(segments: &[BlameSegment]) -> BlameVector {
    let mut vector = Vec::with_capacity(line_total(segments));
    for segment in segments {
        for offset in 0..segment.line_count {
            vector.push(BlameLine {
                commit_hash: segment.commit_hash.clone(),
                line_number: segment.line_start + offset,
            });
        }
    }
    vector
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlameLine {
    pub commit_hash: Option<String>,
    pub line_number: usize,
}

pub type BlameVector = Vec<BlameLine>;

/// Result of a blame query, returned as JSON to JS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlameResult {
    pub blame_vector: BlameVector,
    pub future_vector: BlameVector,
    pub previous_commit_hash: Option<String>,
    pub next_commit_hash: Option<String>,
    /// The queried commit's own hunks; empty for point-in-time queries.
    pub hunks: Vec<Hunk>,
}
