//! Centralized path functions for all app storage locations.

use std::path::PathBuf;

/// App cache root: `~/Library/Caches/chatroom-reports/` (macOS) or
/// `~/.cache/chatroom-reports/` (Linux).
pub fn app_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("chatroom-reports"))
}

/// SQLite database file: `<app_cache_dir>/chatroom-reports.db`.
pub fn db_path() -> Option<PathBuf> {
    app_cache_dir().map(|d| d.join("chatroom-reports.db"))
}
