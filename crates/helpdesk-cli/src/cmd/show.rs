//! `hd show` — display one ticket with its comment thread.

use super::{Session, human_time};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use clap::Args;
use helpdesk_core::model::{Comment, Ticket, TicketId};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Ticket ID (`12` or `#12`).
    pub id: TicketId,
}

/// Full ticket detail as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub comments: Vec<Comment>,
}

pub fn run_show(args: &ShowArgs, session: &Session<'_>) -> anyhow::Result<()> {
    let project = session.open()?;
    let ticket = project.desk.get_ticket(&project.actor, args.id)?;
    let comments = project.desk.list_comments(&project.actor, args.id)?;

    let detail = TicketDetail { ticket, comments };
    render_mode(
        session.output,
        &detail,
        |d, w| {
            write_ticket_text(&d.ticket, w)?;
            for comment in &d.comments {
                write_comment_row(comment, w)?;
            }
            Ok(())
        },
        |d, w| {
            write_ticket_pretty(&d.ticket, w)?;
            if !d.comments.is_empty() {
                writeln!(w)?;
                pretty_section(w, &format!("Comments ({})", d.comments.len()))?;
                for comment in &d.comments {
                    write_comment_pretty(comment, w)?;
                }
            }
            Ok(())
        },
    )
}

/// Render a single ticket the way mutating commands report their result.
pub fn render_ticket(mode: OutputMode, ticket: &Ticket) -> anyhow::Result<()> {
    render_mode(mode, ticket, write_ticket_text, write_ticket_pretty)
}

pub fn write_ticket_pretty(ticket: &Ticket, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("#{}  {}", ticket.id, ticket.topic))?;
    pretty_kv(w, "Status", ticket.status.as_str())?;
    pretty_kv(w, "Priority", ticket.priority.as_str())?;
    pretty_kv(w, "Owner", ticket.owner.as_str())?;
    pretty_kv(w, "Created", human_time(ticket.created_at))?;
    pretty_kv(w, "Updated", human_time(ticket.updated_at))?;
    if !ticket.decline_reason.is_empty() {
        pretty_kv(w, "Decline reason", &ticket.decline_reason)?;
    }
    if ticket.restore_request {
        pretty_kv(w, "Restoration", "requested")?;
    }
    writeln!(w)?;
    writeln!(w, "{}", ticket.description)
}

/// `key<TAB>value` lines, one per field.
pub fn write_ticket_text(ticket: &Ticket, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "id\t{}", ticket.id)?;
    writeln!(w, "topic\t{}", ticket.topic)?;
    writeln!(w, "status\t{}", ticket.status)?;
    writeln!(w, "priority\t{}", ticket.priority)?;
    writeln!(w, "owner\t{}", ticket.owner)?;
    writeln!(w, "decline_reason\t{}", ticket.decline_reason)?;
    writeln!(w, "restore_request\t{}", ticket.restore_request)?;
    writeln!(w, "created_at\t{}", ticket.created_at.to_rfc3339())?;
    writeln!(w, "updated_at\t{}", ticket.updated_at.to_rfc3339())?;
    writeln!(w, "version\t{}", ticket.version)?;
    writeln!(w, "description\t{}", ticket.description.replace('\n', " "))
}

pub fn write_comment_pretty(comment: &Comment, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "#{}  {}  {}",
        comment.id,
        comment.author,
        human_time(comment.created_at)
    )?;
    for line in comment.text.lines() {
        writeln!(w, "    {line}")?;
    }
    pretty_rule(w)
}

/// One tab-separated row: id, ticket, author, created, text.
pub fn write_comment_row(comment: &Comment, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}",
        comment.id,
        comment.ticket_id,
        comment.author,
        comment.created_at.to_rfc3339(),
        comment.text.replace('\n', " ")
    )
}

#[cfg(test)]
mod tests {
    use super::{write_comment_row, write_ticket_pretty, write_ticket_text};
    use chrono::{TimeZone, Utc};
    use helpdesk_core::model::{
        ActorId, Comment, CommentId, NewTicket, Priority, Status, Ticket, TicketId,
    };

    fn ticket() -> Ticket {
        let mut ticket = NewTicket {
            owner: ActorId::new("ursula"),
            topic: "Printer jam".to_string(),
            description: "Tray 2\njams".to_string(),
            priority: Priority::High,
            created_at: Utc.with_ymd_and_hms(2024, 9, 2, 8, 30, 0).unwrap(),
        }
        .into_ticket(TicketId(7));
        ticket.status = Status::Declined;
        ticket.decline_reason = "duplicate".to_string();
        ticket
    }

    #[test]
    fn pretty_ticket_shows_reason_only_when_set() {
        let mut out = Vec::new();
        write_ticket_pretty(&ticket(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("#7  Printer jam\n"));
        assert!(text.contains("Decline reason:  duplicate"));
        assert!(!text.contains("Restoration"));
    }

    #[test]
    fn text_ticket_is_one_line_per_field() {
        let mut out = Vec::new();
        write_ticket_text(&ticket(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 11);
        assert!(text.contains("version\t1\n"));
        assert!(text.contains("status\tdeclined\n"));
        assert!(text.contains("description\tTray 2 jams\n"));
    }

    #[test]
    fn comment_row_flattens_newlines() {
        let at = Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap();
        let comment = Comment {
            id: CommentId(3),
            ticket_id: TicketId(7),
            author: ActorId::new("sam"),
            text: "line one\nline two".to_string(),
            created_at: at,
            updated_at: at,
        };
        let mut out = Vec::new();
        write_comment_row(&comment, &mut out).unwrap();
        let row = String::from_utf8(out).unwrap();
        assert!(row.starts_with("3\t7\tsam\t"));
        assert!(row.ends_with("\tline one line two\n"));
    }
}
