//! SQLite schema for the helpdesk store.
//!
//! - `tickets` holds the current state of each ticket; CHECK constraints
//!   mirror the decline-reason and restore-flag invariants so a buggy writer
//!   cannot persist an inconsistent row
//! - `tickets.version` is the compare-and-set token every ticket write checks
//!   and bumps
//! - `ticket_comments` and `restoration_requests` cascade with their ticket

/// Schema v1: tables, the one-pending-restoration rule and listing indexes.
pub const SCHEMA_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS tickets (
    ticket_id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL CHECK (length(trim(owner)) > 0),
    topic TEXT NOT NULL CHECK (length(trim(topic)) > 0),
    description TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'low' CHECK (priority IN ('low', 'medium', 'high')),
    status TEXT NOT NULL DEFAULT 'active' CHECK (
        status IN ('active', 'in-process', 'in-restoration', 'declined', 'approved', 'done')
    ),
    decline_reason TEXT NOT NULL DEFAULT '',
    restore_request INTEGER NOT NULL DEFAULT 0 CHECK (restore_request IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    CHECK ((status = 'declined') = (length(trim(decline_reason)) > 0)),
    CHECK ((status = 'in-restoration') = (restore_request = 1))
);

CREATE TABLE IF NOT EXISTS ticket_comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL REFERENCES tickets(ticket_id) ON DELETE CASCADE,
    author TEXT NOT NULL CHECK (length(trim(author)) > 0),
    body TEXT NOT NULL CHECK (length(trim(body)) > 0),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS restoration_requests (
    restoration_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL REFERENCES tickets(ticket_id) ON DELETE CASCADE,
    decline_reason TEXT NOT NULL,
    requested_at_us INTEGER NOT NULL,
    outcome TEXT CHECK (outcome IS NULL OR outcome IN ('approved', 'declined')),
    resolved_at_us INTEGER,
    CHECK ((outcome IS NULL) = (resolved_at_us IS NULL))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_restoration_requests_one_pending
    ON restoration_requests(ticket_id)
    WHERE outcome IS NULL;

CREATE INDEX IF NOT EXISTS idx_tickets_owner_created
    ON tickets(owner, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_tickets_status_priority_created
    ON tickets(status, priority, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_ticket_comments_ticket_created
    ON ticket_comments(ticket_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_restoration_requests_requested
    ON restoration_requests(requested_at_us, restoration_id);
";

/// Indexes expected by list and filter query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_restoration_requests_one_pending",
    "idx_tickets_owner_created",
    "idx_tickets_status_priority_created",
    "idx_ticket_comments_ticket_created",
    "idx_restoration_requests_requested",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn seeded_conn() -> anyhow::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;

        for idx in 0..24_i64 {
            let owner = if idx % 3 == 0 { "ann" } else { "bob" };
            let status = if idx % 2 == 0 { "active" } else { "approved" };
            let priority = if idx % 4 == 0 { "high" } else { "low" };
            conn.execute(
                "INSERT INTO tickets (
                    owner, topic, description, priority, status,
                    created_at_us, updated_at_us
                 ) VALUES (?1, ?2, 'seeded', ?3, ?4, ?5, ?5)",
                params![owner, format!("Ticket {idx}"), priority, status, idx],
            )?;
        }
        Ok(conn)
    }

    fn query_plan_details(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        stmt.query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()
    }

    fn insert_ticket(conn: &Connection, status: &str, reason: &str, flag: i64) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO tickets (
                owner, topic, description, status, decline_reason, restore_request,
                created_at_us, updated_at_us
             ) VALUES ('ann', 'Topic', 'Body', ?1, ?2, ?3, 0, 0)",
            params![status, reason, flag],
        )
    }

    #[test]
    fn check_constraints_mirror_ticket_invariants() -> anyhow::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;

        assert!(insert_ticket(&conn, "declined", "spam", 0).is_ok());
        assert!(insert_ticket(&conn, "in-restoration", "", 1).is_ok());

        assert!(insert_ticket(&conn, "declined", "", 0).is_err());
        assert!(insert_ticket(&conn, "declined", "   ", 0).is_err());
        assert!(insert_ticket(&conn, "approved", "spam", 0).is_err());
        assert!(insert_ticket(&conn, "in-restoration", "", 0).is_err());
        assert!(insert_ticket(&conn, "active", "", 1).is_err());
        assert!(insert_ticket(&conn, "rejected", "", 0).is_err());

        let version: i64 =
            conn.query_row("SELECT version FROM tickets WHERE ticket_id = 1", [], |row| row.get(0))?;
        assert_eq!(version, 1);
        assert!(
            conn.execute("UPDATE tickets SET version = 0 WHERE ticket_id = 1", [])
                .is_err()
        );
        Ok(())
    }

    #[test]
    fn only_one_pending_restoration_per_ticket() -> anyhow::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;
        insert_ticket(&conn, "in-restoration", "", 1)?;

        let open = "INSERT INTO restoration_requests (ticket_id, decline_reason, requested_at_us)
                    VALUES (1, 'spam', 0)";
        conn.execute(open, [])?;
        assert!(conn.execute(open, []).is_err());

        conn.execute(
            "UPDATE restoration_requests SET outcome = 'approved', resolved_at_us = 5",
            [],
        )?;
        conn.execute(open, [])?;
        Ok(())
    }

    #[test]
    fn query_plan_uses_owner_index() -> anyhow::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT ticket_id
             FROM tickets
             WHERE owner = 'ann'
             ORDER BY created_at_us DESC",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_tickets_owner_created")),
            "expected owner index in plan, got: {details:?}"
        );
        Ok(())
    }

    #[test]
    fn query_plan_uses_comment_thread_index() -> anyhow::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT comment_id
             FROM ticket_comments
             WHERE ticket_id = 3
             ORDER BY created_at_us DESC",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_ticket_comments_ticket_created")),
            "expected comment index in plan, got: {details:?}"
        );
        Ok(())
    }
}
