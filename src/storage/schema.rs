use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    // One row per accepted measurement; rows are never updated
    conn.execute(
        "CREATE TABLE IF NOT EXISTS speed_tests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            provider TEXT NOT NULL,
            server TEXT,
            download_mbps REAL NOT NULL DEFAULT 0.0,
            upload_mbps REAL NOT NULL DEFAULT 0.0,
            latency_ms REAL NOT NULL DEFAULT 0.0,
            raw_json TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )",
        [],
    )?;

    create_indexes(conn)?;

    Ok(())
}

fn create_indexes(conn: &Connection) -> rusqlite::Result<()> {
    // Index on timestamp for time-based queries
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_speed_tests_timestamp
         ON speed_tests(timestamp)",
        [],
    )?;

    // Index on provider for per-provider queries
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_speed_tests_provider
         ON speed_tests(provider)",
        [],
    )?;

    Ok(())
}
