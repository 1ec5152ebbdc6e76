use super::{
    TicketStore, TicketWrite, check_comment_status, check_ticket_current, missing_pending_request,
    next_version,
};
use crate::error::{HelpdeskError, Missing, Result};
use crate::model::comment::sort_newest_first;
use crate::model::{
    Comment, CommentId, NewComment, NewTicket, RestorationChange, RestorationFilter,
    RestorationId, RestorationRequest, Status, Ticket, TicketFilter, TicketId,
};
use anyhow::anyhow;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    tickets: BTreeMap<TicketId, Ticket>,
    comments: BTreeMap<CommentId, Comment>,
    restorations: BTreeMap<RestorationId, RestorationRequest>,
    last_ticket: i64,
    last_comment: i64,
    last_restoration: i64,
}

impl State {
    fn status_of(&self, ticket: TicketId) -> Result<Status> {
        self.tickets
            .get(&ticket)
            .map(|stored| stored.status)
            .ok_or(HelpdeskError::NotFound(Missing::Ticket(ticket)))
    }

    fn apply_restoration(&mut self, ticket: TicketId, change: RestorationChange) -> Result<()> {
        match change {
            RestorationChange::Unchanged => {}
            RestorationChange::Open { decline_reason, at } => {
                self.last_restoration += 1;
                let id = RestorationId(self.last_restoration);
                self.restorations.insert(
                    id,
                    RestorationRequest {
                        id,
                        ticket_id: ticket,
                        decline_reason,
                        requested_at: at,
                        outcome: None,
                        resolved_at: None,
                    },
                );
            }
            RestorationChange::Resolve { outcome, at } => {
                let pending = self
                    .restorations
                    .values_mut()
                    .find(|request| request.ticket_id == ticket && request.is_pending())
                    .ok_or_else(|| missing_pending_request(ticket))?;
                pending.outcome = Some(outcome);
                pending.resolved_at = Some(at);
            }
        }
        Ok(())
    }
}

/// Mutex-guarded in-process store.
///
/// One lock covers all entities, so every method is trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| HelpdeskError::Storage(anyhow!("memory store lock poisoned")))
    }
}

impl TicketStore for MemoryStore {
    fn insert_ticket(&self, new: NewTicket) -> Result<Ticket> {
        let mut state = self.lock()?;
        state.last_ticket += 1;
        let ticket = new.into_ticket(TicketId(state.last_ticket));
        state.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    fn ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        Ok(self.lock()?.tickets.get(&id).cloned())
    }

    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let state = self.lock()?;
        let mut tickets: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|ticket| filter.matches(ticket))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tickets)
    }

    fn commit_ticket(&self, write: TicketWrite) -> Result<Ticket> {
        let mut state = self.lock()?;
        let id = write.ticket.id;
        let stored = state
            .tickets
            .get(&id)
            .ok_or(HelpdeskError::NotFound(Missing::Ticket(id)))?;
        check_ticket_current(&write, stored.status, stored.version)?;

        // Apply the side effect first so a failed resolve leaves the ticket untouched.
        state.apply_restoration(id, write.restoration)?;
        let ticket = next_version(write.ticket);
        state.tickets.insert(id, ticket.clone());
        Ok(ticket)
    }

    fn delete_ticket(&self, id: TicketId) -> Result<()> {
        let mut state = self.lock()?;
        if state.tickets.remove(&id).is_none() {
            return Err(HelpdeskError::NotFound(Missing::Ticket(id)));
        }
        state.comments.retain(|_, comment| comment.ticket_id != id);
        state.restorations.retain(|_, request| request.ticket_id != id);
        Ok(())
    }

    fn insert_comment(&self, new: NewComment, expected: Status) -> Result<Comment> {
        let mut state = self.lock()?;
        check_comment_status(new.ticket_id, expected, state.status_of(new.ticket_id)?)?;
        state.last_comment += 1;
        let comment = new.into_comment(CommentId(state.last_comment));
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    fn comment(&self, id: CommentId) -> Result<Option<Comment>> {
        Ok(self.lock()?.comments.get(&id).cloned())
    }

    fn list_comments(&self, ticket: TicketId) -> Result<Vec<Comment>> {
        let state = self.lock()?;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|comment| comment.ticket_id == ticket)
            .cloned()
            .collect();
        sort_newest_first(&mut comments);
        Ok(comments)
    }

    fn update_comment(&self, comment: &Comment, expected: Status) -> Result<Comment> {
        let mut state = self.lock()?;
        check_comment_status(comment.ticket_id, expected, state.status_of(comment.ticket_id)?)?;
        let stored = state
            .comments
            .get_mut(&comment.id)
            .ok_or(HelpdeskError::NotFound(Missing::Comment(comment.id)))?;
        stored.text.clone_from(&comment.text);
        stored.updated_at = comment.updated_at;
        Ok(stored.clone())
    }

    fn delete_comment(&self, comment: &Comment, expected: Status) -> Result<()> {
        let mut state = self.lock()?;
        check_comment_status(comment.ticket_id, expected, state.status_of(comment.ticket_id)?)?;
        state
            .comments
            .remove(&comment.id)
            .map(|_| ())
            .ok_or(HelpdeskError::NotFound(Missing::Comment(comment.id)))
    }

    fn restoration_requests(&self, filter: &RestorationFilter) -> Result<Vec<RestorationRequest>> {
        let state = self.lock()?;
        let mut requests: Vec<RestorationRequest> = state
            .restorations
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then_with(|| a.id.cmp(&b.id)));
        Ok(requests)
    }
}
