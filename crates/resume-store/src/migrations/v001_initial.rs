//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `users`, `reports` and `weekly_stats`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (admins, sections, viewers)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,              -- argon2 PHC string
    role          TEXT NOT NULL DEFAULT 'section'
                  CHECK (role IN ('admin', 'section', 'viewer')),
    created_at    TEXT NOT NULL               -- RFC-3339
);

-- ----------------------------------------------------------------
-- Service reports, one per section per service
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS reports (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    section_id      INTEGER NOT NULL,         -- FK -> users(id)
    date            TEXT NOT NULL,            -- YYYY-MM-DD
    preacher        TEXT NOT NULL,
    total_attendees INTEGER NOT NULL,
    men             INTEGER NOT NULL DEFAULT 0,
    women           INTEGER NOT NULL DEFAULT 0,
    children        INTEGER NOT NULL DEFAULT 0,
    youth           INTEGER NOT NULL DEFAULT 0,
    offering        REAL NOT NULL DEFAULT 0.0,
    currency        TEXT NOT NULL DEFAULT 'XOF',
    notes           TEXT,
    submitted_by    TEXT,                     -- username snapshot
    submitted_at    TEXT NOT NULL,

    FOREIGN KEY (section_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_reports_date ON reports(date DESC);
CREATE INDEX IF NOT EXISTS idx_reports_section_date ON reports(section_id, date);

-- ----------------------------------------------------------------
-- Weekly aggregates, derived from reports
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS weekly_stats (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    section_id      INTEGER NOT NULL,         -- FK -> users(id)
    week_start      TEXT NOT NULL,            -- Monday, YYYY-MM-DD
    week_end        TEXT NOT NULL,            -- Sunday, YYYY-MM-DD
    total_offering  REAL NOT NULL DEFAULT 0.0,
    currency        TEXT NOT NULL DEFAULT 'XOF',
    total_attendees INTEGER NOT NULL DEFAULT 0,
    total_services  INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,

    FOREIGN KEY (section_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS unique_weekly_stats
    ON weekly_stats(section_id, week_start);
CREATE INDEX IF NOT EXISTS idx_weekly_stats_week ON weekly_stats(week_start);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
