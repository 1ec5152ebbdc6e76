//! `hd comment` — discuss a ticket while it is being processed.

use super::Session;
use super::show::{write_comment_pretty, write_comment_row};
use crate::output::{pretty_section, render_mode, render_success};
use clap::{Args, Subcommand};
use helpdesk_core::model::{Comment, CommentId, TicketId};
use std::io::Write;

#[derive(Args, Debug)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommand,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    #[command(
        about = "Add a comment to an in-process ticket",
        after_help = "EXAMPLES:\n    # Add a progress note\n    hd comment add 12 \"Replaced the fuser\"\n\n    # Comment as a specific user\n    hd --actor sam comment add 12 \"Parts ordered\""
    )]
    Add(CommentAddArgs),

    #[command(
        about = "List comments on a ticket, newest first",
        after_help = "EXAMPLES:\n    hd comment list 12\n\n    # Emit machine-readable output\n    hd comment list 12 --json"
    )]
    List(CommentListArgs),

    #[command(about = "Show one comment")]
    Show(CommentIdArgs),

    #[command(
        about = "Replace the text of your own comment",
        after_help = "EXAMPLES:\n    hd comment edit 4 \"Replaced the fuser and the tray\""
    )]
    Edit(CommentEditArgs),

    #[command(about = "Delete your own comment")]
    Delete(CommentIdArgs),
}

#[derive(Args, Debug)]
pub struct CommentAddArgs {
    /// Ticket ID to comment on.
    pub ticket: TicketId,

    /// Comment text.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct CommentListArgs {
    /// Ticket ID whose thread to list.
    pub ticket: TicketId,
}

#[derive(Args, Debug)]
pub struct CommentIdArgs {
    /// Comment ID (`4` or `#4`).
    pub id: CommentId,
}

#[derive(Args, Debug)]
pub struct CommentEditArgs {
    /// Comment ID (`4` or `#4`).
    pub id: CommentId,

    /// New comment text.
    pub text: String,
}

pub fn run_comment(args: &CommentArgs, session: &Session<'_>) -> anyhow::Result<()> {
    let project = session.open()?;
    let desk = &project.desk;
    let actor = &project.actor;

    match &args.command {
        CommentCommand::Add(add) => {
            let comment = desk.create_comment(actor, add.ticket, &add.text)?;
            render_comment(session, &comment)
        }
        CommentCommand::List(list) => {
            let comments = desk.list_comments(actor, list.ticket)?;
            render_mode(
                session.output,
                &comments,
                |c, w| {
                    for comment in c {
                        write_comment_row(comment, w)?;
                    }
                    Ok(())
                },
                |c, w| {
                    if c.is_empty() {
                        return writeln!(w, "No comments on ticket #{}.", list.ticket);
                    }
                    pretty_section(w, &format!("Comments on #{} ({})", list.ticket, c.len()))?;
                    for comment in c {
                        write_comment_pretty(comment, w)?;
                    }
                    Ok(())
                },
            )
        }
        CommentCommand::Show(show) => {
            let comment = desk.get_comment(actor, show.id)?;
            render_comment(session, &comment)
        }
        CommentCommand::Edit(edit) => {
            let comment = desk.update_comment(actor, edit.id, &edit.text)?;
            render_comment(session, &comment)
        }
        CommentCommand::Delete(delete) => {
            desk.delete_comment(actor, delete.id)?;
            if session.quiet && !session.output.is_json() {
                return Ok(());
            }
            render_success(session.output, &format!("deleted comment #{}", delete.id))
        }
    }
}

fn render_comment(session: &Session<'_>, comment: &Comment) -> anyhow::Result<()> {
    render_mode(
        session.output,
        comment,
        write_comment_row,
        write_comment_pretty,
    )
}
