use tracing::debug;

use super::segments::{replay, Direction};
use super::types::{flatten, line_total, wipe, BlameSegments, BlameVector};
use crate::config::BlameConfig;
use crate::error::Result;
use crate::history::FileCommit;

fn step(
    segments: &BlameSegments,
    commit: &FileCommit,
    direction: Direction,
    config: &BlameConfig,
) -> Result<BlameSegments> {
    let next = replay(segments, &commit.hunks, &commit.hash, direction)?;
    config.check_lines(line_total(&next))?;
    Ok(next)
}

/// Replay a file's history in both directions.
///
/// The first vector is the blame of the file after its first `backward_end`
/// commits. The second is the "future blame" of the file after its first
/// `reverse_end` commits: each line is attributed to the commit that next
/// modifies or deletes it, or to nothing if it survives to the end of
/// `history`.
///
/// Both ends are clamped to `history.len()`.
pub fn blame(
    history: &[FileCommit],
    backward_end: usize,
    reverse_end: usize,
    config: &BlameConfig,
) -> Result<(BlameVector, BlameVector)> {
    let backward_end = backward_end.min(history.len());
    let reverse_end = reverse_end.min(history.len());
    config.check_commits(history.len() + (history.len() - reverse_end))?;

    let mut segments = BlameSegments::new();
    for commit in &history[..backward_end] {
        segments = step(&segments, commit, Direction::Forward, config)?;
    }
    let blame_vector = flatten(&segments);

    // Run forward to the head so the reverse pass starts from the final
    // line count.
    for commit in &history[backward_end..] {
        segments = step(&segments, commit, Direction::Forward, config)?;
    }
    debug!(
        commits = history.len(),
        head_lines = line_total(&segments),
        backward_end,
        reverse_end,
        "replayed history to head"
    );

    let mut segments = wipe(&segments);
    for commit in history[reverse_end..].iter().rev() {
        segments = step(&segments, commit, Direction::Reverse, config)?;
    }
    let future_vector = flatten(&segments);

    Ok((blame_vector, future_vector))
}
