pub mod migrations;
pub mod queries;
#[cfg(test)]
pub mod testing;

use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    init_db_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

/// Opens the database and migrates it. `busy_timeout` bounds how long a writer
/// waits for another connection's write lock before failing.
pub fn init_db_with_timeout(path: &str, busy_timeout: Duration) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;
    conn.busy_timeout(busy_timeout)
        .context("failed to set busy timeout")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
