//! `hd restorations` — staff view of restoration requests, oldest first.

use super::{Session, human_time};
use crate::output::{pretty_rule, render_mode};
use clap::Args;
use helpdesk_core::model::{RestorationFilter, RestorationOutcome, RestorationRequest, TicketId};
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct RestorationsArgs {
    /// Only requests still waiting for a staff decision.
    #[arg(long)]
    pub pending: bool,

    /// Only requests for this ticket.
    #[arg(long)]
    pub ticket: Option<TicketId>,
}

pub fn run_restorations(args: &RestorationsArgs, session: &Session<'_>) -> anyhow::Result<()> {
    let project = session.open()?;
    let filter = RestorationFilter {
        pending_only: args.pending,
        ticket: args.ticket,
    };
    let requests = project
        .desk
        .list_restoration_requests(&project.actor, &filter)?;
    render_mode(
        session.output,
        &requests,
        |r, w| write_text(r, w),
        |r, w| write_pretty(r, w),
    )
}

fn outcome(request: &RestorationRequest) -> &'static str {
    request
        .outcome
        .map_or("pending", RestorationOutcome::as_str)
}

fn write_text(requests: &[RestorationRequest], w: &mut dyn Write) -> io::Result<()> {
    for request in requests {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            request.id,
            request.ticket_id,
            outcome(request),
            request.requested_at.to_rfc3339(),
            request.decline_reason
        )?;
    }
    Ok(())
}

fn write_pretty(requests: &[RestorationRequest], w: &mut dyn Write) -> io::Result<()> {
    if requests.is_empty() {
        return writeln!(w, "No restoration requests.");
    }
    writeln!(
        w,
        "{:>5}  {:>7}  {:<9}  {:<20}  DECLINED BECAUSE",
        "ID", "TICKET", "OUTCOME", "REQUESTED"
    )?;
    pretty_rule(w)?;
    for request in requests {
        writeln!(
            w,
            "{:>5}  {:>7}  {:<9}  {:<20}  {}",
            request.id,
            format!("#{}", request.ticket_id),
            outcome(request),
            human_time(request.requested_at),
            request.decline_reason
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_text;
    use chrono::{TimeZone, Utc};
    use helpdesk_core::model::{RestorationId, RestorationOutcome, RestorationRequest, TicketId};

    #[test]
    fn text_rows_show_outcome_or_pending() {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let pending = RestorationRequest {
            id: RestorationId(1),
            ticket_id: TicketId(9),
            decline_reason: "spam".to_string(),
            requested_at: at,
            outcome: None,
            resolved_at: None,
        };
        let resolved = RestorationRequest {
            id: RestorationId(2),
            outcome: Some(RestorationOutcome::Approved),
            resolved_at: Some(at),
            ..pending.clone()
        };
        let mut out = Vec::new();
        write_text(&[pending, resolved], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<_> = text.lines().collect();
        assert!(rows[0].starts_with("1\t9\tpending\t"));
        assert!(rows[1].starts_with("2\t9\tapproved\t"));
    }
}
