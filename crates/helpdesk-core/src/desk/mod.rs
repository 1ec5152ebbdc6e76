//! The operation entry points a front end calls.
//!
//! Each call takes the acting identity explicitly, loads what it needs,
//! asks the access policy, runs the workflow or comment rules and commits
//! through the store in one atomic write.

mod comments;
mod tickets;

use crate::clock::{Clock, SystemClock};
use crate::error::{HelpdeskError, Missing, Result};
use crate::model::{Actor, Comment, CommentId, Ticket, TicketId};
use crate::policy::{Decision, Operation, Resource, authorize};
use crate::store::TicketStore;
use crate::validate::Limits;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Helpdesk<S, C = SystemClock> {
    store: S,
    clock: C,
    limits: Limits,
}

impl<S: TicketStore> Helpdesk<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: TicketStore, C: Clock> Helpdesk<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            limits: Limits::default(),
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn limits(&self) -> &Limits {
        &self.limits
    }

    fn enforce(&self, actor: &Actor, operation: Operation<'_>, resource: Resource<'_>) -> Result<()> {
        match authorize(actor, operation, resource) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                debug!(
                    actor = %actor,
                    operation = operation.name(),
                    reason = reason.code(),
                    "request denied"
                );
                Err(reason.into_error(operation.name()))
            }
        }
    }

    fn load_ticket(&self, id: TicketId) -> Result<Ticket> {
        self.store
            .ticket(id)?
            .ok_or(HelpdeskError::NotFound(Missing::Ticket(id)))
    }

    /// Load a comment together with the ticket it belongs to.
    fn load_comment(&self, id: CommentId) -> Result<(Ticket, Comment)> {
        let comment = self
            .store
            .comment(id)?
            .ok_or(HelpdeskError::NotFound(Missing::Comment(id)))?;
        let ticket = self.load_ticket(comment.ticket_id)?;
        Ok((ticket, comment))
    }
}

/// Log commit-time conflicts before handing them back to the caller.
fn note_conflict<T>(result: Result<T>, actor: &Actor, operation: &str) -> Result<T> {
    if let Err(err) = &result
        && err.is_retryable()
    {
        warn!(actor = %actor, operation, error = %err, "write lost a race");
    }
    result
}
