use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            phone       TEXT NOT NULL,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        -- Ordered list; duplicates allowed, so the key is the position.
        CREATE TABLE IF NOT EXISTS emergency_contacts (
            user_id     TEXT NOT NULL REFERENCES users(id),
            position    INTEGER NOT NULL,
            phone       TEXT NOT NULL,
            PRIMARY KEY (user_id, position)
        );

        CREATE TABLE IF NOT EXISTS sos_events (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            id              TEXT NOT NULL UNIQUE,
            user_id         TEXT NOT NULL REFERENCES users(id),
            lat             REAL NOT NULL,
            lng             REAL NOT NULL,
            triggered_by    TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sos_events_user
            ON sos_events(user_id, seq);

        -- One row per contact snapshotted at dispatch time.
        CREATE TABLE IF NOT EXISTS sos_deliveries (
            event_id    TEXT NOT NULL REFERENCES sos_events(id),
            position    INTEGER NOT NULL,
            contact     TEXT NOT NULL,
            success     INTEGER NOT NULL,
            response    TEXT,
            error       TEXT,
            PRIMARY KEY (event_id, position)
        );

        CREATE TABLE IF NOT EXISTS location_pings (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL REFERENCES users(id),
            lat         REAL NOT NULL,
            lng         REAL NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_location_pings_user
            ON location_pings(user_id, seq);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
