use tracing::trace;

use super::types::{line_total, BlameSegment, BlameSegments};
use crate::error::{BlameError, Result};
use crate::history::Hunk;

/// Which side of each hunk is the source when replaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Old lines are replaced by new lines, as the commit was made.
    Forward,
    /// New lines are replaced by old lines, undoing the commit.
    Reverse,
}

impl Direction {
    fn orient(self, hunk: &Hunk) -> Hunk {
        match self {
            Direction::Forward => *hunk,
            Direction::Reverse => hunk.reversed(),
        }
    }
}

/// Cursor over an old segment list that emits a new one.
///
/// The position in the old list is a segment index plus the number of lines
/// still unread in that segment.
struct SegmentCursor<'a> {
    old: &'a [BlameSegment],
    index: usize,
    remaining: usize,
    /// Next 1-based line number in the old file version.
    old_line: usize,
    /// Next 1-based line number in the new file version.
    new_line: usize,
    out: BlameSegments,
    commit: &'a str,
}

impl<'a> SegmentCursor<'a> {
    fn new(old: &'a [BlameSegment], commit: &'a str) -> Self {
        SegmentCursor {
            old,
            index: 0,
            remaining: old.first().map_or(0, |s| s.line_count),
            old_line: 1,
            new_line: 1,
            out: Vec::with_capacity(old.len() + 2),
            commit,
        }
    }

    fn advance_segment(&mut self) {
        self.index += 1;
        self.remaining = self.old.get(self.index).map_or(0, |s| s.line_count);
    }

    fn out_of_range(&self) -> BlameError {
        BlameError::HunkOutOfRange {
            commit: self.commit.to_string(),
            line: self.old_line,
        }
    }

    /// Append a run to the output, merging it into the previous run when it
    /// continues the same commit's lines.
    fn emit(&mut self, segment: BlameSegment) {
        if segment.line_count == 0 {
            return;
        }
        if let Some(last) = self.out.last_mut() {
            if last.commit_hash == segment.commit_hash
                && last.line_start + last.line_count == segment.line_start
            {
                last.line_count += segment.line_count;
                return;
            }
        }
        self.out.push(segment);
    }

    /// Walk `count` old lines, splitting the segment the walk ends in. Each
    /// piece is copied to the output when `copy` is set.
    fn walk(&mut self, mut count: usize, copy: bool) -> Result<()> {
        let old = self.old;
        while count > 0 {
            let Some(segment) = old.get(self.index) else {
                return Err(self.out_of_range());
            };
            if self.remaining == 0 {
                self.advance_segment();
                continue;
            }

            let take = count.min(self.remaining);
            if copy {
                let progress = segment.line_count - self.remaining;
                let piece = BlameSegment {
                    line_count: take,
                    line_start: segment.line_start + progress,
                    commit_hash: segment.commit_hash.clone(),
                };
                self.emit(piece);
                self.new_line += take;
            }
            self.remaining -= take;
            self.old_line += take;
            count -= take;

            if self.remaining == 0 {
                self.advance_segment();
            }
        }
        Ok(())
    }

    /// Copy `count` unchanged lines into the output.
    fn fast_forward(&mut self, count: usize) -> Result<()> {
        self.walk(count, true)
    }

    /// Drop `count` old lines.
    fn skip(&mut self, count: usize) -> Result<()> {
        self.walk(count, false)
    }

    /// Add `count` lines written by `hash`, numbered from their position in
    /// the new file version.
    fn append(&mut self, count: usize, hash: &str) {
        let segment = BlameSegment {
            line_count: count,
            line_start: self.new_line,
            commit_hash: Some(hash.to_string()),
        };
        self.emit(segment);
        self.new_line += count;
    }

    /// Copy everything left in the old list.
    fn finish(mut self) -> Result<BlameSegments> {
        let old = self.old;
        let rest = self.remaining + line_total(old.get(self.index + 1..).unwrap_or(&[]));
        self.fast_forward(rest)?;
        Ok(self.out)
    }
}

/// Apply one commit's hunks to `old`, producing the segments of the next file
/// version. In [`Direction::Reverse`] each hunk's sides are swapped, so the
/// commit is undone and the lines it removed are attributed to it.
///
/// Hunks must be in ascending order and consistent with `old`; a hunk that
/// reaches past the end of `old` yields [`BlameError::HunkOutOfRange`].
pub fn replay(
    old: &[BlameSegment],
    hunks: &[Hunk],
    commit_hash: &str,
    direction: Direction,
) -> Result<BlameSegments> {
    let mut cursor = SegmentCursor::new(old, commit_hash);

    for hunk in hunks.iter().map(|h| direction.orient(h)) {
        cursor.fast_forward(hunk.old_start.saturating_sub(cursor.old_line))?;
        if hunk.old_length > 0 {
            cursor.skip(hunk.old_length)?;
        }
        cursor.fast_forward(hunk.new_start.saturating_sub(cursor.new_line))?;
        if hunk.new_length > 0 {
            cursor.append(hunk.new_length, commit_hash);
        }
    }

    let new = cursor.finish()?;

    trace!(
        commit = commit_hash,
        ?direction,
        old_lines = line_total(old),
        new_lines = line_total(&new),
        "replayed hunks"
    );
    debug_assert_eq!(
        line_total(&new),
        line_total(old) + hunks.iter().map(|h| direction.orient(h).new_length).sum::<usize>()
            - hunks.iter().map(|h| direction.orient(h).old_length).sum::<usize>()
    );

    Ok(new)
}
