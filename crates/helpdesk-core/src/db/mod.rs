//! SQLite-backed ticket store.
//!
//! Every connection gets the same session settings: foreign keys on (ticket
//! deletes cascade), a 5s busy timeout (a second `hd` process waits for the
//! write lock instead of failing) and, for files, WAL journaling.

pub mod migrations;
pub mod schema;
pub mod store;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

pub use store::SqliteStore;

/// How long a writer waits for another connection's lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the database file at `path`, creating parent directories, then
/// configure and migrate it.
///
/// # Errors
///
/// Fails if the file cannot be opened, the pragmas cannot be applied or a
/// migration fails.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("open ticket database {}", path.display()))?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .context("switch to WAL journaling")?;
    prepare(conn)
}

/// Open a private in-memory database with the full schema.
///
/// # Errors
///
/// Fails if the schema cannot be created.
pub fn open_in_memory() -> Result<Connection> {
    prepare(Connection::open_in_memory().context("open in-memory database")?)
}

fn prepare(mut conn: Connection) -> Result<Connection> {
    conn.pragma_update(None, "foreign_keys", true)
        .and_then(|()| conn.pragma_update(None, "synchronous", "NORMAL"))
        .and_then(|()| conn.busy_timeout(DEFAULT_BUSY_TIMEOUT))
        .context("apply connection pragmas")?;
    let version = migrations::migrate(&mut conn).context("migrate ticket schema")?;
    tracing::debug!(version, "ticket database ready");
    Ok(conn)
}
