//! SQL schema for the Clubhouse SQLite store.
//!
//! Executed once at connection startup. Uniqueness invariants live here as
//! constraints; the store relies on them for its conditional inserts.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS training_sessions (
    session_id  TEXT PRIMARY KEY,
    club_id     TEXT NOT NULL,
    title       TEXT NOT NULL,
    start_time  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parent_links (
    link_id     TEXT PRIMARY KEY,
    parent_id   TEXT NOT NULL,
    athlete_id  TEXT NOT NULL,
    status      TEXT NOT NULL,    -- 'pending' | 'approved' | 'revoked'
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    UNIQUE (parent_id, athlete_id)
);

CREATE TABLE IF NOT EXISTS athlete_profiles (
    profile_id  TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    club_id     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (user_id, club_id)
);

-- `version` is the compare-and-swap column for review transitions.
CREATE TABLE IF NOT EXISTS membership_applications (
    application_id TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL,
    club_id        TEXT NOT NULL,
    personal_info  TEXT NOT NULL,            -- JSON object
    documents      TEXT NOT NULL DEFAULT '[]',
    status         TEXT NOT NULL,            -- 'pending' | 'approved' | 'rejected'
    review         TEXT,                     -- JSON-encoded ReviewInfo or NULL
    profile_id     TEXT REFERENCES athlete_profiles(profile_id),
    version        INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,
    UNIQUE (user_id, club_id)
);

CREATE TABLE IF NOT EXISTS leave_requests (
    leave_request_id TEXT PRIMARY KEY,
    session_id       TEXT NOT NULL REFERENCES training_sessions(session_id),
    athlete_id       TEXT NOT NULL,
    club_id          TEXT NOT NULL,
    requested_by     TEXT NOT NULL,
    reason           TEXT NOT NULL,
    status           TEXT NOT NULL,
    review           TEXT,
    version          INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    UNIQUE (session_id, athlete_id)
);

-- Activity log entries are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS activity_log (
    entity_id   TEXT NOT NULL,
    seq         INTEGER NOT NULL,
    entry       TEXT NOT NULL,               -- JSON-encoded ActivityLogEntry
    PRIMARY KEY (entity_id, seq)
);

CREATE TABLE IF NOT EXISTS attendance (
    record_id     TEXT PRIMARY KEY,
    session_id    TEXT NOT NULL REFERENCES training_sessions(session_id),
    athlete_id    TEXT NOT NULL,
    status        TEXT NOT NULL,             -- 'present' | 'late' | 'absent' | 'excused'
    check_in_time TEXT,
    recorded_at   TEXT NOT NULL,
    UNIQUE (session_id, athlete_id)
);

CREATE TABLE IF NOT EXISTS idempotency_records (
    key           TEXT NOT NULL,
    operation_id  TEXT NOT NULL,
    result        TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    PRIMARY KEY (key, operation_id)
);

CREATE INDEX IF NOT EXISTS applications_club_idx ON membership_applications(club_id);
CREATE INDEX IF NOT EXISTS parent_links_parent_idx ON parent_links(parent_id);

PRAGMA user_version = 1;
";
