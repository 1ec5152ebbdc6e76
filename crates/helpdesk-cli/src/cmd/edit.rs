//! `hd edit` — owner partial update of an active ticket.

use super::{Session, parse_field, payload_from};
use super::show::render_ticket;
use clap::Args;
use helpdesk_core::model::TicketId;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Ticket ID (`12` or `#12`).
    pub id: TicketId,

    /// Field to change, as `field=value`. Repeatable. Only `description`
    /// and `priority` are editable.
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_field, required = true)]
    pub set: Vec<(String, String)>,
}

pub fn run_edit(args: &EditArgs, session: &Session<'_>) -> anyhow::Result<()> {
    let project = session.open()?;
    let ticket = project
        .desk
        .edit_ticket(&project.actor, args.id, &payload_from(&args.set))?;
    render_ticket(session.output, &ticket)
}
