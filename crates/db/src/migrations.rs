/// Inline SQL migrations for the chatroom-reports database schema.
///
/// We use simple inline migrations rather than sqlx migration files
/// because the schema is small and self-contained.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: rooms
    r#"
CREATE TABLE IF NOT EXISTS rooms (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
"#,
    // Migration 2: messages
    r#"
CREATE TABLE IF NOT EXISTS messages (
    id         INTEGER PRIMARY KEY,
    room_id    INTEGER NOT NULL REFERENCES rooms(id),
    sender     TEXT NOT NULL,
    body       TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_messages_room ON messages(room_id);"#,
    // Migration 3: participants reports. (period, start_date) identifies a bucket.
    r#"
CREATE TABLE IF NOT EXISTS participants_reports (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    period       TEXT NOT NULL CHECK (period IN ('daily', 'monthly', 'yearly', 'all')),
    start_date   TEXT NOT NULL,
    end_date     TEXT NOT NULL,
    participants INTEGER NOT NULL DEFAULT 0 CHECK (participants >= 0),
    created_at   INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER)),
    updated_at   INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER)),
    UNIQUE(period, start_date)
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_participants_start
       ON participants_reports(start_date DESC);"#,
    // Migration 4: app settings (single row)
    r#"
CREATE TABLE IF NOT EXISTS app_settings (
    id                   INTEGER PRIMARY KEY CHECK (id = 1),
    report_interval_secs INTEGER NOT NULL DEFAULT 3600,
    backfill_days        INTEGER NOT NULL DEFAULT 30
);
"#,
    r#"INSERT OR IGNORE INTO app_settings (id) VALUES (1);"#,
];
