//! `hd list` — tickets visible to the acting user, newest first.
//!
//! Staff see every ticket; anyone else sees only their own, whatever
//! `--owner` says.

use super::{Session, human_time};
use crate::output::{pretty_rule, render_mode};
use clap::Args;
use helpdesk_core::model::{ActorId, Priority, Status, Ticket, TicketFilter};
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only tickets in this status (e.g. `active`, `in-process`).
    #[arg(long)]
    pub status: Option<Status>,

    /// Only tickets with this priority.
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Only tickets filed by this user (staff only).
    #[arg(long)]
    pub owner: Option<String>,
}

impl ListArgs {
    fn filter(&self) -> TicketFilter {
        TicketFilter {
            status: self.status,
            priority: self.priority,
            owner: self.owner.as_deref().map(ActorId::new),
        }
    }
}

pub fn run_list(args: &ListArgs, session: &Session<'_>) -> anyhow::Result<()> {
    let project = session.open()?;
    let tickets = project.desk.list_tickets(&project.actor, &args.filter())?;
    render_mode(
        session.output,
        &tickets,
        |t, w| write_text(t, w),
        |t, w| write_pretty(t, w),
    )
}

fn write_text(tickets: &[Ticket], w: &mut dyn Write) -> io::Result<()> {
    if tickets.is_empty() {
        return Ok(());
    }
    writeln!(w, "id\tstatus\tpriority\towner\ttopic")?;
    for ticket in tickets {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            ticket.id, ticket.status, ticket.priority, ticket.owner, ticket.topic
        )?;
    }
    Ok(())
}

fn write_pretty(tickets: &[Ticket], w: &mut dyn Write) -> io::Result<()> {
    if tickets.is_empty() {
        return writeln!(w, "No tickets.");
    }
    writeln!(
        w,
        "{:>5}  {:<14}  {:<8}  {:<12}  {:<20}  TOPIC",
        "ID", "STATUS", "PRIORITY", "OWNER", "CREATED"
    )?;
    pretty_rule(w)?;
    for ticket in tickets {
        writeln!(
            w,
            "{:>5}  {:<14}  {:<8}  {:<12}  {:<20}  {}",
            format!("#{}", ticket.id),
            ticket.status.as_str(),
            ticket.priority.as_str(),
            ticket.owner.as_str(),
            human_time(ticket.created_at),
            ticket.topic
        )?;
    }
    Ok(())
}
