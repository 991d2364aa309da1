use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use super::types::{FileCommit, FileHistory, GitHistory, Hunk};
use crate::config::BlameConfig;
use crate::error::{BlameError, Result};

/// Matches a `-U0` hunk header. An omitted length means 1; a trailing dash
/// after the closing `@@` marks a header whose content lines were stripped.
fn hunk_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(-?)")
            .expect("hunk header pattern is valid")
    })
}

fn parse_error(line: usize, message: impl Into<String>) -> BlameError {
    BlameError::Parse {
        line,
        message: message.into(),
    }
}

fn capture_number(caps: &Captures, group: usize, line: usize) -> Result<usize> {
    match caps.get(group) {
        Some(m) => m
            .as_str()
            .parse()
            .map_err(|_| parse_error(line, format!("line number out of range: {}", m.as_str()))),
        None => Ok(1),
    }
}

/// Parse a hunk header and the number of content lines that follow it.
fn parse_hunk(caps: &Captures, line: usize) -> Result<(Hunk, usize)> {
    let hunk = Hunk {
        old_start: capture_number(caps, 1, line)?,
        old_length: capture_number(caps, 2, line)?,
        new_start: capture_number(caps, 3, line)?,
        new_length: capture_number(caps, 4, line)?,
    };
    match (hunk.old_end(), hunk.new_end(), hunk.content_lines()) {
        (Some(_), Some(_), Some(content)) => Ok((hunk, content)),
        _ => Err(parse_error(line, "hunk range overflows")),
    }
}

fn is_stripped(caps: &Captures) -> bool {
    caps.get(5).map_or(false, |m| !m.as_str().is_empty())
}

fn truncate_hash(hash: &str, length: usize) -> String {
    if length == 0 {
        return hash.to_string();
    }
    hash.get(..length).unwrap_or(hash).to_string()
}

/// Consume the `count` content lines that follow a hunk header.
/// `\ No newline at end of file` markers are not part of the count.
fn skip_content<'a, I>(lines: &mut I, count: usize)
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut remaining = count;
    while remaining > 0 {
        match lines.next() {
            Some((_, line)) if line.starts_with('\\') => continue,
            Some(_) => remaining -= 1,
            None => break,
        }
    }
}

/// Parse the output of
/// `git log -U0 --format='commit %H' --no-prefix --no-renames --reverse
/// --no-ext-diff --no-textconv --first-parent -m` (or its stripped form, see
/// [`strip_git_log`]) into a [`GitHistory`].
///
/// Every `commit` line is recorded in the global commit order, even when the
/// commit touched no text file. A `---`/`+++` pair opens a new file commit on
/// the new path for created files and on the old path otherwise.
pub fn parse_git_log(input: &str, config: &BlameConfig) -> Result<GitHistory> {
    let mut file_histories: HashMap<String, FileHistory> = HashMap::new();
    let mut commit_hashes: Vec<String> = Vec::new();
    let mut current_path: Option<String> = None;

    let mut lines = input.lines().enumerate().map(|(i, l)| (i + 1, l));

    while let Some((line_no, line)) = lines.next() {
        if let Some(hash) = line.strip_prefix("commit ") {
            let hash = hash.trim();
            if hash.is_empty() {
                return Err(parse_error(line_no, "empty commit hash"));
            }
            commit_hashes.push(truncate_hash(hash, config.hash_length));
            current_path = None;
        } else if let Some(old_path) = line.strip_prefix("--- ") {
            let commit = commit_hashes
                .last()
                .ok_or_else(|| parse_error(line_no, "file header before any commit"))?;
            let new_path = match lines.next() {
                Some((_, next)) => next
                    .strip_prefix("+++ ")
                    .ok_or_else(|| parse_error(line_no + 1, "expected +++ after ---"))?,
                None => return Err(parse_error(line_no, "log ends inside a file header")),
            };
            let path = if old_path == "/dev/null" { new_path } else { old_path };
            let path = path.trim_end_matches('\t').to_string();

            file_histories
                .entry(path.clone())
                .or_default()
                .push(FileCommit::new(commit.clone(), Vec::new()));
            current_path = Some(path);
        } else if line.starts_with("@@ ") {
            let caps = hunk_header()
                .captures(line)
                .ok_or_else(|| parse_error(line_no, format!("bad hunk header: {}", line)))?;
            let (hunk, content_lines) = parse_hunk(&caps, line_no)?;

            let file_commit = current_path
                .as_ref()
                .and_then(|path| file_histories.get_mut(path))
                .and_then(|history| history.last_mut())
                .ok_or_else(|| parse_error(line_no, "hunk before any file header"))?;
            file_commit.hunks.push(hunk);

            if !is_stripped(&caps) {
                skip_content(&mut lines, content_lines);
            }
        }
    }

    debug!(
        commits = commit_hashes.len(),
        files = file_histories.len(),
        "parsed git log"
    );

    GitHistory::new(file_histories, commit_hashes)
}

/// Drop the `+`/`-` content lines from a git log, keeping only commit, file
/// and hunk header lines. Each hunk header is cut after its closing `@@` and
/// suffixed with `-` so [`parse_git_log`] knows no content follows.
pub fn strip_git_log(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len() / 4);
    let mut lines = input.lines().enumerate().map(|(i, l)| (i + 1, l));

    while let Some((line_no, line)) = lines.next() {
        if line.starts_with("commit ") || line.starts_with("--- ") || line.starts_with("+++ ") {
            out.push_str(line);
            out.push('\n');
        } else if line.starts_with("@@ ") {
            let caps = hunk_header()
                .captures(line)
                .ok_or_else(|| parse_error(line_no, format!("bad hunk header: {}", line)))?;
            let header_end = caps.get(5).map_or(line.len(), |m| m.start());
            out.push_str(&line[..header_end]);
            out.push_str("-\n");

            if !is_stripped(&caps) {
                let (_, content_lines) = parse_hunk(&caps, line_no)?;
                skip_content(&mut lines, content_lines);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Three commits on `test.txt`: create 3 lines, replace the first two,
    /// delete everything. Commit 1 adds a line that reads like a file header
    /// once it is removed.
    pub(crate) const SAMPLE_LOG: &str = "\
commit b9a26a4383eb51c1a0c3d5e7f9b1d3f5a7c9e1f3

diff --git test.txt test.txt
new file mode 100644
index 0000000..3b18e51
--- /dev/null
+++ test.txt
@@ -0,0 +1,3 @@
+hello
+-- old
+world
commit b0539826eadc3feb0a2c4e6f8a0b2c4d6e8f0a1b

diff --git test.txt test.txt
index 3b18e51..9c2f1aa 100644
--- test.txt
+++ test.txt
@@ -1,2 +1,2 @@
-hello
--- old
+one
+two
commit 42838bca4ba13c3f5d7f9b1c3e5a7c9e1b3d5f70

diff --git test.txt test.txt
deleted file mode 100644
index 9c2f1aa..0000000
--- test.txt
+++ /dev/null
@@ -1,3 +0,0 @@
-one
-two
-world
\\ No newline at end of file
";

    fn expected_hunks() -> Vec<(&'static str, Hunk)> {
        vec![
            ("b9a26a4383eb51c1", Hunk::new(0, 0, 1, 3)),
            ("b0539826eadc3feb", Hunk::new(1, 2, 1, 2)),
            ("42838bca4ba13c3f", Hunk::new(1, 3, 0, 0)),
        ]
    }

    fn assert_sample(history: &GitHistory) {
        assert_eq!(history.paths(), vec!["test.txt"]);
        let file = history.file_history("test.txt").unwrap();
        assert_eq!(file.len(), 3);
        for (commit, (hash, hunk)) in file.iter().zip(expected_hunks()) {
            assert_eq!(commit.hash, hash);
            assert_eq!(commit.hunks, vec![hunk]);
        }
        assert_eq!(
            history.commit_hashes(),
            &["b9a26a4383eb51c1", "b0539826eadc3feb", "42838bca4ba13c3f"]
        );
    }

    #[test]
    fn test_parse_full_log() {
        let history = parse_git_log(SAMPLE_LOG, &BlameConfig::default()).unwrap();
        assert_sample(&history);
    }

    #[test]
    fn test_parse_stripped_log() {
        let stripped = strip_git_log(SAMPLE_LOG).unwrap();
        assert!(stripped.contains("@@ -1,2 +1,2 @@-\n"));
        assert!(!stripped.contains("hello"));
        let history = parse_git_log(&stripped, &BlameConfig::default()).unwrap();
        assert_sample(&history);
    }

    #[test]
    fn test_strip_is_idempotent() {
        let once = strip_git_log(SAMPLE_LOG).unwrap();
        let twice = strip_git_log(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_omitted_lengths_default_to_one() {
        let log = "commit aaaa\n--- a.txt\n+++ a.txt\n@@ -4 +4 @@\n-x\n+y\n";
        let history = parse_git_log(log, &BlameConfig::default()).unwrap();
        assert_eq!(
            history.file_history("a.txt").unwrap()[0].hunks,
            vec![Hunk::new(4, 1, 4, 1)]
        );
    }

    #[test]
    fn test_commits_without_files_are_recorded() {
        let log = "commit aaaa\ncommit bbbb\n--- /dev/null\n+++ b.txt\n@@ -0,0 +1 @@-\n";
        let history = parse_git_log(log, &BlameConfig::default()).unwrap();
        assert_eq!(history.commit_hashes(), &["aaaa", "bbbb"]);
        assert_eq!(history.file_history("b.txt").unwrap()[0].hash, "bbbb");
    }

    #[test]
    fn test_hash_length_zero_keeps_full_hash() {
        let config = BlameConfig {
            hash_length: 0,
            ..BlameConfig::default()
        };
        let history = parse_git_log(SAMPLE_LOG, &config).unwrap();
        assert_eq!(history.commit_hashes()[0].len(), 40);
    }

    #[test]
    fn test_huge_hunk_lengths_are_parse_errors() {
        let log = "commit aaaa\n--- a.txt\n+++ a.txt\n@@ -1,18446744073709551615 +1 @@\n-x\n+y\n";
        let err = parse_git_log(log, &BlameConfig::default()).unwrap_err();
        assert!(matches!(err, BlameError::Parse { line: 4, .. }));

        let log = "commit aaaa\n--- a.txt\n+++ a.txt\n@@ -1,18446744073709551615 +1 @@-\n@@ -5 +5 @@-\n";
        let err = parse_git_log(log, &BlameConfig::default()).unwrap_err();
        assert!(matches!(err, BlameError::Parse { line: 4, .. }));

        let log = "commit aaaa\n--- a.txt\n+++ a.txt\n@@ -1,18446744073709551615 +1,1 @@\n";
        assert!(strip_git_log(log).is_err());
    }

    #[test]
    fn test_hunk_before_file_header() {
        let err = parse_git_log("commit aaaa\n@@ -1 +1 @@-\n", &BlameConfig::default()).unwrap_err();
        assert!(matches!(err, BlameError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_bad_hunk_header() {
        let log = "commit aaaa\n--- a.txt\n+++ a.txt\n@@ garbage @@\n";
        let err = parse_git_log(log, &BlameConfig::default()).unwrap_err();
        assert!(matches!(err, BlameError::Parse { line: 4, .. }));
    }

    #[test]
    fn test_parse_empty() {
        let history = parse_git_log("", &BlameConfig::default()).unwrap();
        assert!(history.commit_hashes().is_empty());
        assert!(history.paths().is_empty());
    }
}
