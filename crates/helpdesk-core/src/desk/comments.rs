use super::{Helpdesk, note_conflict};
use crate::clock::Clock;
use crate::error::{HelpdeskError, Result};
use crate::model::{Actor, Comment, CommentId, NewComment, Payload, TicketId};
use crate::policy::{COMMENT_FIELDS, DenyReason, Operation, Resource};
use crate::store::TicketStore;
use tracing::info;

impl<S: TicketStore, C: Clock> Helpdesk<S, C> {
    /// Comment on a ticket that is being processed.
    ///
    /// # Errors
    ///
    /// See [`Helpdesk::create_comment_with`].
    pub fn create_comment(&self, actor: &Actor, ticket_id: TicketId, text: &str) -> Result<Comment> {
        self.create_comment_with(actor, ticket_id, &Payload::new().with("text", text))
    }

    /// Comment creation from a raw field map; only `text` is accepted.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` unless staff or the ticket owner,
    /// `InvalidStateTransition` unless the ticket is in process, `Validation`
    /// for other fields or bad text, `StaleState` if the ticket moved on
    /// before the comment was written.
    pub fn create_comment_with(
        &self,
        actor: &Actor,
        ticket_id: TicketId,
        payload: &Payload,
    ) -> Result<Comment> {
        let ticket = self.load_ticket(ticket_id)?;
        let names = payload.field_names();
        self.enforce(
            actor,
            Operation::Create { fields: &names },
            Resource::Comments(&ticket),
        )?;
        let author = actor
            .identity()
            .map(|identity| identity.id.clone())
            .ok_or(HelpdeskError::PermissionDenied {
                reason: DenyReason::Unauthenticated,
            })?;
        let text = payload
            .get("text")
            .ok_or_else(|| HelpdeskError::validation("text", "is required"))?;
        let draft = NewComment {
            ticket_id,
            author,
            text: self.limits.comment_text(text)?,
            created_at: self.clock.now(),
        };
        let comment = note_conflict(
            self.store.insert_comment(draft, ticket.status),
            actor,
            "comment",
        )?;
        info!(ticket = %ticket_id, comment = %comment.id, author = %comment.author, "comment added");
        Ok(comment)
    }

    /// # Errors
    ///
    /// `NotFound` or `PermissionDenied`.
    pub fn get_comment(&self, actor: &Actor, id: CommentId) -> Result<Comment> {
        let (ticket, comment) = self.load_comment(id)?;
        self.enforce(
            actor,
            Operation::Read,
            Resource::Comment {
                ticket: &ticket,
                comment: &comment,
            },
        )?;
        Ok(comment)
    }

    /// Comments on a ticket, newest first.
    ///
    /// # Errors
    ///
    /// `NotFound` or `PermissionDenied`.
    pub fn list_comments(&self, actor: &Actor, ticket_id: TicketId) -> Result<Vec<Comment>> {
        let ticket = self.load_ticket(ticket_id)?;
        self.enforce(actor, Operation::Read, Resource::Comments(&ticket))?;
        self.store.list_comments(ticket_id)
    }

    /// Replace the text of the actor's own comment.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` for anyone but the author (staff included),
    /// `InvalidStateTransition` unless the ticket is in process,
    /// `Validation` for bad text, `StaleState` on a commit-time race.
    pub fn update_comment(&self, actor: &Actor, id: CommentId, text: &str) -> Result<Comment> {
        let (ticket, comment) = self.load_comment(id)?;
        self.enforce(
            actor,
            Operation::Update {
                fields: COMMENT_FIELDS,
            },
            Resource::Comment {
                ticket: &ticket,
                comment: &comment,
            },
        )?;
        let mut next = comment;
        next.text = self.limits.comment_text(text)?;
        next.updated_at = self.clock.now();
        let saved = note_conflict(
            self.store.update_comment(&next, ticket.status),
            actor,
            "edit comment",
        )?;
        info!(ticket = %ticket.id, comment = %id, "comment edited");
        Ok(saved)
    }

    /// # Errors
    ///
    /// Same as [`Helpdesk::update_comment`] minus validation.
    pub fn delete_comment(&self, actor: &Actor, id: CommentId) -> Result<()> {
        let (ticket, comment) = self.load_comment(id)?;
        self.enforce(
            actor,
            Operation::Delete,
            Resource::Comment {
                ticket: &ticket,
                comment: &comment,
            },
        )?;
        note_conflict(
            self.store.delete_comment(&comment, ticket.status),
            actor,
            "delete comment",
        )?;
        info!(ticket = %ticket.id, comment = %id, "comment deleted");
        Ok(())
    }
}
