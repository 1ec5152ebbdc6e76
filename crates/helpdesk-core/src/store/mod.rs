//! Durable storage behind the helpdesk service.
//!
//! Every mutating method is one atomic read-modify-write. Ticket writes are
//! compare-and-set on the version (and status) the caller observed, so any
//! intervening write, status change or not, aborts the commit. Comment writes
//! re-check that the parent ticket is still in the status the caller
//! authorized against. Nothing is written when either check fails.

pub mod memory;

use crate::error::{HelpdeskError, Result};
use crate::model::{
    Comment, CommentId, NewComment, NewTicket, RestorationChange, RestorationFilter,
    RestorationRequest, Status, Ticket, TicketFilter, TicketId,
};

pub use memory::MemoryStore;

/// A ticket update derived from a snapshot.
///
/// `ticket.version` is the version that snapshot was read at; the commit only
/// goes through while the stored ticket is still at that version and in the
/// `expected` status, and stores it as the next version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketWrite {
    pub ticket: Ticket,
    pub expected: Status,
    pub restoration: RestorationChange,
}

impl TicketWrite {
    /// A plain field update with no restoration side effect.
    #[must_use]
    pub fn fields(ticket: Ticket, expected: Status) -> Self {
        Self {
            ticket,
            expected,
            restoration: RestorationChange::Unchanged,
        }
    }
}

pub trait TicketStore: Send + Sync {
    /// Persist a new ticket and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn insert_ticket(&self, new: NewTicket) -> Result<Ticket>;

    /// # Errors
    ///
    /// Storage failures only; a missing ticket is `Ok(None)`.
    fn ticket(&self, id: TicketId) -> Result<Option<Ticket>>;

    /// Tickets matching `filter`, newest first with ties broken by id
    /// ascending.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>>;

    /// Replace a ticket and apply its restoration side effect atomically,
    /// returning it at its new version.
    ///
    /// # Errors
    ///
    /// `NotFound` when the ticket is gone, `ConcurrentModification` when it
    /// was written since `write.ticket` was read.
    fn commit_ticket(&self, write: TicketWrite) -> Result<Ticket>;

    /// Delete a ticket together with its comments and restoration requests.
    ///
    /// # Errors
    ///
    /// `NotFound` when the ticket does not exist.
    fn delete_ticket(&self, id: TicketId) -> Result<()>;

    /// # Errors
    ///
    /// `NotFound` for a missing ticket, `StaleState` when its status is no
    /// longer `expected`.
    fn insert_comment(&self, new: NewComment, expected: Status) -> Result<Comment>;

    /// # Errors
    ///
    /// Storage failures only; a missing comment is `Ok(None)`.
    fn comment(&self, id: CommentId) -> Result<Option<Comment>>;

    /// Comments on `ticket`, newest first with ties broken by id ascending.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn list_comments(&self, ticket: TicketId) -> Result<Vec<Comment>>;

    /// Store the new text and `updated_at` of an existing comment.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing comment or ticket, `StaleState` when the
    /// ticket status is no longer `expected`.
    fn update_comment(&self, comment: &Comment, expected: Status) -> Result<Comment>;

    /// # Errors
    ///
    /// Same as [`TicketStore::update_comment`].
    fn delete_comment(&self, comment: &Comment, expected: Status) -> Result<()>;

    /// Restoration requests matching `filter`, oldest request first.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn restoration_requests(&self, filter: &RestorationFilter) -> Result<Vec<RestorationRequest>>;
}

/// Compare-and-set guard for ticket writes against the stored status and
/// version.
pub(crate) fn check_ticket_current(write: &TicketWrite, found: Status, stored_version: u32) -> Result<()> {
    if write.expected == found && write.ticket.version == stored_version {
        Ok(())
    } else {
        Err(HelpdeskError::ConcurrentModification {
            ticket: write.ticket.id,
            expected: write.expected,
            found,
            read_version: write.ticket.version,
            stored_version,
        })
    }
}

/// The stored form of a ticket that passed [`check_ticket_current`].
pub(crate) fn next_version(mut ticket: Ticket) -> Ticket {
    ticket.version += 1;
    ticket
}

/// Commit-time guard for comment writes.
pub(crate) fn check_comment_status(ticket: TicketId, expected: Status, found: Status) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(HelpdeskError::StaleState {
            ticket,
            expected,
            found,
        })
    }
}

/// Raised when a resolve finds no pending request for an in-restoration
/// ticket.
pub(crate) const fn missing_pending_request(ticket: TicketId) -> HelpdeskError {
    HelpdeskError::Invariant {
        ticket,
        detail: "in-restoration ticket has no pending restoration request",
    }
}
