//! Status transition commands: `hd decline`, `hd approve`, `hd restore`,
//! `hd start` and `hd complete`.
//!
//! All five share one path: read the ticket, fire the named transition
//! against that snapshot, and report the stored result. A ticket that moved
//! between the read and the commit fails with a concurrent-modification
//! error instead of being overwritten.

use super::{Session, parse_field, payload_from};
use super::show::render_ticket;
use clap::Args;
use helpdesk_core::model::{Payload, TicketId};
use helpdesk_core::workflow::Transition;
use tracing::debug;

#[derive(Args, Debug)]
pub struct TransitionArgs {
    /// Ticket ID (`12` or `#12`).
    pub id: TicketId,

    /// Extra payload field as `field=value`. Repeatable.
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_field)]
    pub set: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct DeclineArgs {
    /// Ticket ID (`12` or `#12`).
    pub id: TicketId,

    /// Why the ticket is declined; shown to the owner.
    #[arg(long)]
    pub reason: String,
}

impl DeclineArgs {
    fn payload(&self) -> Payload {
        Payload::new().with("decline_reason", self.reason.as_str())
    }
}

pub fn run_decline(args: &DeclineArgs, session: &Session<'_>) -> anyhow::Result<()> {
    fire(Transition::Decline, args.id, &args.payload(), session)
}

pub fn run_transition(
    transition: Transition,
    args: &TransitionArgs,
    session: &Session<'_>,
) -> anyhow::Result<()> {
    fire(transition, args.id, &payload_from(&args.set), session)
}

fn fire(
    transition: Transition,
    id: TicketId,
    payload: &Payload,
    session: &Session<'_>,
) -> anyhow::Result<()> {
    let project = session.open()?;
    let observed = project.desk.get_ticket(&project.actor, id)?;
    debug!(ticket = %id, status = %observed.status, transition = %transition, "firing");
    let ticket = project
        .desk
        .transition_observed(&project.actor, &observed, transition, payload)?;
    render_ticket(session.output, &ticket)
}
