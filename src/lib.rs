pub mod blame;
pub mod config;
pub mod error;
pub mod history;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;

use tracing::warn;
use wasm_bindgen::prelude::*;

pub use blame::{BlameLine, BlameQuery, BlameResult, BlameSegment, BlameVector};
pub use config::BlameConfig;
pub use error::{BlameError, Result};
pub use history::{parse_git_log, strip_git_log, FileCommit, FileHistory, GitHistory, Hunk};

// ---------------------------------------------------------------------------
// Handle storage for ingested histories across WASM calls.
// ---------------------------------------------------------------------------

/// Global storage for ingested histories, keyed by opaque u32 handles.
/// Histories are immutable once stored; queries clone the `Arc` and release
/// the lock before replaying.
fn history_store() -> &'static Mutex<HistoryStore> {
    static STORE: OnceLock<Mutex<HistoryStore>> = OnceLock::new();
    STORE.get_or_init(|| Mutex::new(HistoryStore::new()))
}

struct StoredHistory {
    history: Arc<GitHistory>,
    config: BlameConfig,
}

struct HistoryStore {
    histories: HashMap<u32, StoredHistory>,
    next_handle: u32,
}

impl HistoryStore {
    fn new() -> Self {
        HistoryStore {
            histories: HashMap::new(),
            next_handle: 1,
        }
    }

    fn insert(&mut self, history: GitHistory, config: BlameConfig) -> u32 {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        if self.next_handle == 0 {
            self.next_handle = 1; // skip 0 as a sentinel
        }
        self.histories.insert(
            handle,
            StoredHistory {
                history: Arc::new(history),
                config,
            },
        );
        handle
    }

    fn get(&self, handle: u32) -> Option<(Arc<GitHistory>, BlameConfig)> {
        self.histories
            .get(&handle)
            .map(|stored| (Arc::clone(&stored.history), stored.config.clone()))
    }

    fn remove(&mut self, handle: u32) -> bool {
        self.histories.remove(&handle).is_some()
    }
}

// ---------------------------------------------------------------------------
// JSON result wrappers.
// ---------------------------------------------------------------------------

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadResult {
    handle: u32,
    commit_count: usize,
    file_count: usize,
}

#[derive(serde::Serialize)]
struct ErrorResult {
    error: String,
    kind: String,
}

fn json_error(msg: &str, kind: &str) -> String {
    serde_json::to_string(&ErrorResult {
        error: msg.to_string(),
        kind: kind.to_string(),
    })
    .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", msg))
}

fn blame_error(err: &BlameError) -> String {
    warn!(kind = err.kind(), "{}", err);
    json_error(&err.to_string(), err.kind())
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| json_error(&format!("Serialization error: {}", e), "serialization"))
}

fn lookup(handle: u32) -> std::result::Result<(Arc<GitHistory>, BlameConfig), String> {
    let store = history_store()
        .lock()
        .map_err(|_| json_error("Failed to acquire history store lock", "store"))?;
    store
        .get(handle)
        .ok_or_else(|| json_error(&format!("Invalid handle: {}", handle), "handle"))
}

// ---------------------------------------------------------------------------
// WASM-exported functions
// ---------------------------------------------------------------------------

/// Ingest raw (or stripped) `git log -U0` output with the default config.
///
/// Returns: JSON string with { handle, commitCount, fileCount }.
///
/// The handle is used with `diff_blame` and `file_blame`, and must be freed
/// with `free_history` when done.
#[wasm_bindgen]
pub fn load_history(raw_log: &[u8]) -> String {
    load_history_with_config(raw_log, "")
}

/// Ingest a git log with a JSON config such as `{"hashLength": 40}`.
/// Omitted config fields keep their defaults.
#[wasm_bindgen]
pub fn load_history_with_config(raw_log: &[u8], config_json: &str) -> String {
    let config = match BlameConfig::from_json(config_json) {
        Ok(c) => c,
        Err(e) => return blame_error(&e),
    };
    let input = match std::str::from_utf8(raw_log) {
        Ok(s) => s,
        Err(e) => return json_error(&format!("Log is not valid UTF-8: {}", e), "parse"),
    };
    let history = match parse_git_log(input, &config) {
        Ok(h) => h,
        Err(e) => return blame_error(&e),
    };

    let commit_count = history.commit_hashes().len();
    let file_count = history.file_histories().len();

    let mut store = match history_store().lock() {
        Ok(s) => s,
        Err(_) => return json_error("Failed to acquire history store lock", "store"),
    };
    let handle = store.insert(history, config);

    to_json(&LoadResult {
        handle,
        commit_count,
        file_count,
    })
}

/// Blame `path` around `commit`, one of the commits that modified it.
///
/// Returns: JSON BlameResult with { blameVector, futureVector,
/// previousCommitHash, nextCommitHash, hunks }, or { error, kind }.
#[wasm_bindgen]
pub fn diff_blame(handle: u32, commit: &str, path: &str) -> String {
    let (history, config) = match lookup(handle) {
        Ok(found) => found,
        Err(e) => return e,
    };
    match BlameQuery::new(&history).with_config(config).diff_blame(commit, path) {
        Ok(result) => to_json(&result),
        Err(e) => blame_error(&e),
    }
}

/// Blame `path` as of `commit`, any commit in the history.
///
/// Returns: JSON BlameResult (with empty hunks), or { error, kind }.
#[wasm_bindgen]
pub fn file_blame(handle: u32, commit: &str, path: &str) -> String {
    let (history, config) = match lookup(handle) {
        Ok(found) => found,
        Err(e) => return e,
    };
    match BlameQuery::new(&history).with_config(config).file_blame(commit, path) {
        Ok(result) => to_json(&result),
        Err(e) => blame_error(&e),
    }
}

/// Strip diff content from a raw git log, keeping only the lines ingestion
/// needs. Returns the stripped log, or a JSON error.
#[wasm_bindgen]
pub fn strip_log(raw_log: &[u8]) -> String {
    let input = match std::str::from_utf8(raw_log) {
        Ok(s) => s,
        Err(e) => return json_error(&format!("Log is not valid UTF-8: {}", e), "parse"),
    };
    match strip_git_log(input) {
        Ok(stripped) => stripped,
        Err(e) => blame_error(&e),
    }
}

/// Free a previously loaded history handle.
///
/// After calling this, the handle is invalid and must not be used.
#[wasm_bindgen]
pub fn free_history(handle: u32) {
    if let Ok(mut store) = history_store().lock() {
        store.remove(handle);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
