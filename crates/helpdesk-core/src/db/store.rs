//! [`TicketStore`] over a single SQLite connection.
//!
//! Every mutation runs in a `BEGIN IMMEDIATE` transaction: the write lock is
//! taken before the stored version is read, so the compare-and-set check and
//! the write it guards cannot interleave with another writer, including one
//! in a different process.

use super::open_database;
use crate::error::{HelpdeskError, Missing, Result};
use crate::model::{
    ActorId, Comment, CommentId, NewComment, NewTicket, RestorationChange, RestorationFilter,
    RestorationId, RestorationOutcome, RestorationRequest, Status, Ticket, TicketFilter,
    TicketId,
};
use crate::store::{
    TicketStore, TicketWrite, check_comment_status, check_ticket_current, missing_pending_request,
    next_version,
};
use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{
    Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params, params_from_iter,
};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

const TICKET_COLUMNS: &str = "ticket_id, owner, topic, description, priority, status, \
                              decline_reason, restore_request, created_at_us, updated_at_us, \
                              version";

const COMMENT_COLUMNS: &str = "comment_id, ticket_id, author, body, created_at_us, updated_at_us";

const RESTORATION_COLUMNS: &str =
    "restoration_id, ticket_id, decline_reason, requested_at_us, outcome, resolved_at_us";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open the database at `path`, creating and migrating it as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::from_connection(open_database(path)?))
    }

    /// A private in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::from_connection(super::open_in_memory()?))
    }

    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| HelpdeskError::Storage(anyhow!("sqlite connection lock poisoned")))
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> anyhow::Result<T>) -> Result<T> {
        let conn = self.lock()?;
        Ok(f(&*conn)?)
    }

    /// Run `f` inside an immediate transaction; any error rolls back.
    fn write<T>(&self, op: &'static str, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .with_context(|| format!("begin {op}"))?;
        let value = f(&tx)?;
        tx.commit().with_context(|| format!("commit {op}"))?;
        Ok(value)
    }
}

fn micros_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let us: i64 = row.get(idx)?;
    micros_to_datetime(idx, us)
}

fn micros_to_datetime(idx: usize, us: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            Box::from(format!("timestamp out of range: {us}")),
        )
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error)))
}

fn row_to_ticket(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: TicketId(row.get(0)?),
        owner: ActorId::new(row.get::<_, String>(1)?),
        topic: row.get(2)?,
        description: row.get(3)?,
        priority: parse_column(row, 4)?,
        status: parse_column(row, 5)?,
        decline_reason: row.get(6)?,
        restore_request: row.get(7)?,
        created_at: micros_column(row, 8)?,
        updated_at: micros_column(row, 9)?,
        version: row.get(10)?,
    })
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: CommentId(row.get(0)?),
        ticket_id: TicketId(row.get(1)?),
        author: ActorId::new(row.get::<_, String>(2)?),
        text: row.get(3)?,
        created_at: micros_column(row, 4)?,
        updated_at: micros_column(row, 5)?,
    })
}

fn row_to_restoration(row: &Row<'_>) -> rusqlite::Result<RestorationRequest> {
    let outcome = match row.get::<_, Option<String>>(4)? {
        Some(text) => Some(text.parse::<RestorationOutcome>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error))
        })?),
        None => None,
    };
    let resolved_at = match row.get::<_, Option<i64>>(5)? {
        Some(us) => Some(micros_to_datetime(5, us)?),
        None => None,
    };
    Ok(RestorationRequest {
        id: RestorationId(row.get(0)?),
        ticket_id: TicketId(row.get(1)?),
        decline_reason: row.get(2)?,
        requested_at: micros_column(row, 3)?,
        outcome,
        resolved_at,
    })
}

fn find_ticket(conn: &Connection, id: TicketId) -> anyhow::Result<Option<Ticket>> {
    conn.query_row(
        &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1"),
        [id.0],
        row_to_ticket,
    )
    .optional()
    .with_context(|| format!("load ticket {id}"))
}

fn find_comment(conn: &Connection, id: CommentId) -> anyhow::Result<Option<Comment>> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM ticket_comments WHERE comment_id = ?1"),
        [id.0],
        row_to_comment,
    )
    .optional()
    .with_context(|| format!("load comment {id}"))
}

/// Status and version of the stored ticket, the two halves of the
/// compare-and-set check.
fn stamp_of(conn: &Connection, id: TicketId) -> Result<(Status, u32)> {
    let stamp: Option<(String, u32)> = conn
        .query_row(
            "SELECT status, version FROM tickets WHERE ticket_id = ?1",
            [id.0],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .with_context(|| format!("read version of ticket {id}"))?;
    let (status, version) = stamp.ok_or(HelpdeskError::NotFound(Missing::Ticket(id)))?;
    let status = status
        .parse::<Status>()
        .with_context(|| format!("decode status of ticket {id}"))?;
    Ok((status, version))
}

fn status_of(conn: &Connection, id: TicketId) -> Result<Status> {
    stamp_of(conn, id).map(|(status, _)| status)
}

fn apply_restoration(tx: &Transaction<'_>, ticket: TicketId, change: &RestorationChange) -> Result<()> {
    match change {
        RestorationChange::Unchanged => {}
        RestorationChange::Open { decline_reason, at } => {
            tx.execute(
                "INSERT INTO restoration_requests (ticket_id, decline_reason, requested_at_us)
                 VALUES (?1, ?2, ?3)",
                params![ticket.0, decline_reason, at.timestamp_micros()],
            )
            .with_context(|| format!("open restoration request for ticket {ticket}"))?;
        }
        RestorationChange::Resolve { outcome, at } => {
            let resolved = tx
                .execute(
                    "UPDATE restoration_requests
                     SET outcome = ?2, resolved_at_us = ?3
                     WHERE ticket_id = ?1 AND outcome IS NULL",
                    params![ticket.0, outcome.as_str(), at.timestamp_micros()],
                )
                .with_context(|| format!("resolve restoration request for ticket {ticket}"))?;
            if resolved == 0 {
                return Err(missing_pending_request(ticket));
            }
        }
    }
    Ok(())
}

fn collect_rows<T>(
    conn: &Connection,
    sql: &str,
    params: &[Box<dyn ToSql>],
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
    what: &'static str,
) -> anyhow::Result<Vec<T>> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("prepare {what} query: {sql}"))?;
    let params_ref: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
    let rows = stmt
        .query_map(params_from_iter(params_ref), map)
        .with_context(|| format!("execute {what} query"))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.with_context(|| format!("read {what} row"))?);
    }
    Ok(out)
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

impl TicketStore for SqliteStore {
    fn insert_ticket(&self, new: NewTicket) -> Result<Ticket> {
        self.write("insert ticket", |tx| {
            tx.execute(
                "INSERT INTO tickets (
                    owner, topic, description, priority, status,
                    decline_reason, restore_request, created_at_us, updated_at_us, version
                 ) VALUES (?1, ?2, ?3, ?4, 'active', '', 0, ?5, ?5, 1)",
                params![
                    new.owner.as_str(),
                    new.topic,
                    new.description,
                    new.priority.as_str(),
                    new.created_at.timestamp_micros()
                ],
            )
            .context("insert ticket row")?;
            let id = TicketId(tx.last_insert_rowid());
            Ok(new.into_ticket(id))
        })
    }

    fn ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        self.read(|conn| find_ticket(conn, id))
    }

    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            param_values.push(Box::new(status.as_str()));
            conditions.push(format!("status = ?{}", param_values.len()));
        }
        if let Some(priority) = filter.priority {
            param_values.push(Box::new(priority.as_str()));
            conditions.push(format!("priority = ?{}", param_values.len()));
        }
        if let Some(ref owner) = filter.owner {
            param_values.push(Box::new(owner.as_str().to_string()));
            conditions.push(format!("owner = ?{}", param_values.len()));
        }

        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets{} \
             ORDER BY created_at_us DESC, ticket_id ASC",
            where_clause(&conditions)
        );
        self.read(|conn| collect_rows(conn, &sql, &param_values, row_to_ticket, "list_tickets"))
    }

    fn commit_ticket(&self, write: TicketWrite) -> Result<Ticket> {
        self.write("commit ticket", |tx| {
            let (found, stored_version) = stamp_of(tx, write.ticket.id)?;
            check_ticket_current(&write, found, stored_version)?;
            apply_restoration(tx, write.ticket.id, &write.restoration)?;
            let ticket = next_version(write.ticket);
            tx.execute(
                "UPDATE tickets
                 SET topic = ?2, description = ?3, priority = ?4, status = ?5,
                     decline_reason = ?6, restore_request = ?7, updated_at_us = ?8,
                     version = ?9
                 WHERE ticket_id = ?1",
                params![
                    ticket.id.0,
                    ticket.topic,
                    ticket.description,
                    ticket.priority.as_str(),
                    ticket.status.as_str(),
                    ticket.decline_reason,
                    ticket.restore_request,
                    ticket.updated_at.timestamp_micros(),
                    ticket.version
                ],
            )
            .with_context(|| format!("update ticket {}", ticket.id))?;
            Ok(ticket)
        })
    }

    fn delete_ticket(&self, id: TicketId) -> Result<()> {
        self.write("delete ticket", |tx| {
            let deleted = tx
                .execute("DELETE FROM tickets WHERE ticket_id = ?1", [id.0])
                .with_context(|| format!("delete ticket {id}"))?;
            if deleted == 0 {
                return Err(HelpdeskError::NotFound(Missing::Ticket(id)));
            }
            Ok(())
        })
    }

    fn insert_comment(&self, new: NewComment, expected: Status) -> Result<Comment> {
        self.write("insert comment", |tx| {
            check_comment_status(new.ticket_id, expected, status_of(tx, new.ticket_id)?)?;
            tx.execute(
                "INSERT INTO ticket_comments (ticket_id, author, body, created_at_us, updated_at_us)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![
                    new.ticket_id.0,
                    new.author.as_str(),
                    new.text,
                    new.created_at.timestamp_micros()
                ],
            )
            .context("insert comment row")?;
            let id = CommentId(tx.last_insert_rowid());
            Ok(new.into_comment(id))
        })
    }

    fn comment(&self, id: CommentId) -> Result<Option<Comment>> {
        self.read(|conn| find_comment(conn, id))
    }

    fn list_comments(&self, ticket: TicketId) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM ticket_comments WHERE ticket_id = ?1 \
             ORDER BY created_at_us DESC, comment_id ASC"
        );
        let param_values: Vec<Box<dyn ToSql>> = vec![Box::new(ticket.0)];
        self.read(|conn| collect_rows(conn, &sql, &param_values, row_to_comment, "list_comments"))
    }

    fn update_comment(&self, comment: &Comment, expected: Status) -> Result<Comment> {
        self.write("update comment", |tx| {
            check_comment_status(comment.ticket_id, expected, status_of(tx, comment.ticket_id)?)?;
            let updated = tx
                .execute(
                    "UPDATE ticket_comments SET body = ?2, updated_at_us = ?3
                     WHERE comment_id = ?1",
                    params![comment.id.0, comment.text, comment.updated_at.timestamp_micros()],
                )
                .with_context(|| format!("update comment {}", comment.id))?;
            if updated == 0 {
                return Err(HelpdeskError::NotFound(Missing::Comment(comment.id)));
            }
            find_comment(tx, comment.id)?
                .ok_or(HelpdeskError::NotFound(Missing::Comment(comment.id)))
        })
    }

    fn delete_comment(&self, comment: &Comment, expected: Status) -> Result<()> {
        self.write("delete comment", |tx| {
            check_comment_status(comment.ticket_id, expected, status_of(tx, comment.ticket_id)?)?;
            let deleted = tx
                .execute("DELETE FROM ticket_comments WHERE comment_id = ?1", [comment.id.0])
                .with_context(|| format!("delete comment {}", comment.id))?;
            if deleted == 0 {
                return Err(HelpdeskError::NotFound(Missing::Comment(comment.id)));
            }
            Ok(())
        })
    }

    fn restoration_requests(&self, filter: &RestorationFilter) -> Result<Vec<RestorationRequest>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();

        if filter.pending_only {
            conditions.push("outcome IS NULL".to_string());
        }
        if let Some(ticket) = filter.ticket {
            param_values.push(Box::new(ticket.0));
            conditions.push(format!("ticket_id = ?{}", param_values.len()));
        }

        let sql = format!(
            "SELECT {RESTORATION_COLUMNS} FROM restoration_requests{} \
             ORDER BY requested_at_us ASC, restoration_id ASC",
            where_clause(&conditions)
        );
        self.read(|conn| {
            collect_rows(
                conn,
                &sql,
                &param_values,
                row_to_restoration,
                "restoration_requests",
            )
        })
    }
}
