//! Forward-only schema upgrades tracked in `PRAGMA user_version`.
//!
//! Several `hd` processes may open a fresh project at once, so the upgrade
//! runs under the write lock and re-reads the version once it holds it. A
//! database written by a newer `hd` is refused rather than half understood.

use super::schema;
use anyhow::{Context, Result, ensure};
use rusqlite::{Connection, TransactionBehavior, types::Type};

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

/// Step `n` (0-based) takes the schema from version `n` to `n + 1`.
const STEPS: [&str; LATEST_SCHEMA_VERSION as usize] = [schema::SCHEMA_V1_SQL];

/// Read `PRAGMA user_version` as a `u32`.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the version is out of range.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

fn ensure_supported(found: u32) -> Result<()> {
    ensure!(
        found <= LATEST_SCHEMA_VERSION,
        "ticket database uses schema v{found} but this hd only knows up to \
         v{LATEST_SCHEMA_VERSION}; upgrade hd"
    );
    Ok(())
}

/// Bring the schema up to [`LATEST_SCHEMA_VERSION`] and return it.
///
/// All pending steps commit together: a failed step leaves the database at
/// the version it was opened with.
///
/// # Errors
///
/// Fails for databases newer than this binary, or when a step fails.
pub fn migrate(conn: &mut Connection) -> Result<u32> {
    let found = current_schema_version(conn).context("read schema version")?;
    ensure_supported(found)?;
    if found == LATEST_SCHEMA_VERSION {
        return Ok(found);
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("lock database for schema upgrade")?;
    // Another process may have upgraded while we waited for the lock.
    let from = current_schema_version(&tx).context("re-read schema version")?;
    ensure_supported(from)?;

    for (version, sql) in (1..=LATEST_SCHEMA_VERSION).zip(STEPS).skip(from as usize) {
        tx.execute_batch(sql)
            .with_context(|| format!("apply schema v{version}"))?;
        tx.pragma_update(None, "user_version", i64::from(version))
            .with_context(|| format!("record schema v{version}"))?;
    }
    tx.commit().context("commit schema upgrade")?;
    if from < LATEST_SCHEMA_VERSION {
        tracing::info!(from, to = LATEST_SCHEMA_VERSION, "upgraded ticket schema");
    }
    Ok(LATEST_SCHEMA_VERSION)
}
