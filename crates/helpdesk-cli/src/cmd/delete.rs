use super::Session;
use crate::output::render_success;
use clap::Args;
use helpdesk_core::model::TicketId;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Ticket ID (`12` or `#12`).
    pub id: TicketId,
}

/// Execute `hd delete`. Staff only; comments and restoration history go
/// with the ticket.
pub fn run_delete(args: &DeleteArgs, session: &Session<'_>) -> anyhow::Result<()> {
    let project = session.open()?;
    project.desk.delete_ticket(&project.actor, args.id)?;
    if session.quiet && !session.output.is_json() {
        return Ok(());
    }
    render_success(session.output, &format!("deleted ticket #{}", args.id))
}
