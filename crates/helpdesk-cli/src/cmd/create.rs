//! `hd create` — file a new ticket as the acting user.

use super::Session;
use super::show::render_ticket;
use clap::Args;
use helpdesk_core::model::Priority;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Short subject line.
    #[arg(long)]
    pub topic: String,

    /// What is wrong and what you need.
    #[arg(long)]
    pub description: String,

    /// `low`, `medium` or `high`; defaults to `[tickets] default_priority`.
    #[arg(long)]
    pub priority: Option<Priority>,
}

pub fn run_create(args: &CreateArgs, session: &Session<'_>) -> anyhow::Result<()> {
    let project = session.open()?;
    let priority = args
        .priority
        .unwrap_or(project.config.tickets.default_priority);
    let ticket = project
        .desk
        .create_ticket(&project.actor, &args.topic, &args.description, priority)?;
    render_ticket(session.output, &ticket)
}
