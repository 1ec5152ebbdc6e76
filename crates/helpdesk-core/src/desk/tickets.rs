use super::{Helpdesk, note_conflict};
use crate::clock::Clock;
use crate::error::Result;
use crate::model::{
    Actor, Payload, Priority, RestorationFilter, RestorationRequest, Ticket, TicketFilter,
    TicketId,
};
use crate::policy::{Operation, Resource};
use crate::store::{TicketStore, TicketWrite};
use crate::workflow::{self, Transition};
use tracing::info;

const CREATE_FIELDS: &[&str] = &["topic", "description", "priority"];

impl<S: TicketStore, C: Clock> Helpdesk<S, C> {
    /// File a new ticket owned by `actor`.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` for anonymous and staff actors, `Validation` for
    /// bad field values.
    pub fn create_ticket(
        &self,
        actor: &Actor,
        topic: &str,
        description: &str,
        priority: Priority,
    ) -> Result<Ticket> {
        self.enforce(
            actor,
            Operation::Create {
                fields: CREATE_FIELDS,
            },
            Resource::Tickets,
        )?;
        let draft = workflow::open(
            actor,
            topic,
            description,
            priority,
            &self.limits,
            self.clock.now(),
        )?;
        let ticket = self.store.insert_ticket(draft)?;
        info!(
            ticket = %ticket.id,
            owner = %ticket.owner,
            priority = %ticket.priority,
            "ticket created"
        );
        Ok(ticket)
    }

    /// # Errors
    ///
    /// `NotFound` or `PermissionDenied`.
    pub fn get_ticket(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        let ticket = self.load_ticket(id)?;
        self.enforce(actor, Operation::Read, Resource::Ticket(&ticket))?;
        Ok(ticket)
    }

    /// Owner partial update of `description` and `priority`.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` for staff and non-owners, `Validation` for fields
    /// outside the editable set or bad values, `InvalidStateTransition` once
    /// the ticket left `Active`, `ConcurrentModification` when it changed
    /// under us.
    pub fn edit_ticket(&self, actor: &Actor, id: TicketId, fields: &Payload) -> Result<Ticket> {
        let ticket = self.load_ticket(id)?;
        let names = fields.field_names();
        self.enforce(
            actor,
            Operation::Update { fields: &names },
            Resource::Ticket(&ticket),
        )?;
        let next = workflow::edit(&ticket, fields, &self.limits, self.clock.now())?;
        let saved = note_conflict(
            self.store
                .commit_ticket(TicketWrite::fields(next, ticket.status)),
            actor,
            "edit",
        )?;
        info!(ticket = %saved.id, actor = %actor, fields = ?names, "ticket edited");
        Ok(saved)
    }

    /// Load the ticket and fire `transition` against what was read.
    ///
    /// # Errors
    ///
    /// See [`Helpdesk::transition_observed`]; also `NotFound`.
    pub fn transition_ticket(
        &self,
        actor: &Actor,
        id: TicketId,
        transition: Transition,
        payload: &Payload,
    ) -> Result<Ticket> {
        let observed = self.load_ticket(id)?;
        self.transition_observed(actor, &observed, transition, payload)
    }

    /// Fire `transition` against a ticket snapshot the caller already read.
    ///
    /// The commit only succeeds while the stored ticket is still at
    /// `observed.version`, so replaying the same snapshot twice fails the
    /// second time, and so does a snapshot taken before an owner edit.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `InvalidStateTransition`, `Validation`, then
    /// `ConcurrentModification` at commit.
    pub fn transition_observed(
        &self,
        actor: &Actor,
        observed: &Ticket,
        transition: Transition,
        payload: &Payload,
    ) -> Result<Ticket> {
        self.enforce(
            actor,
            Operation::Transition(transition),
            Resource::Ticket(observed),
        )?;
        let applied = workflow::apply(
            actor,
            observed,
            transition,
            payload,
            &self.limits,
            self.clock.now(),
        )?;
        let saved = note_conflict(
            self.store.commit_ticket(TicketWrite {
                ticket: applied.ticket,
                expected: observed.status,
                restoration: applied.restoration,
            }),
            actor,
            transition.as_str(),
        )?;
        info!(
            ticket = %saved.id,
            actor = %actor,
            transition = %transition,
            from = %observed.status,
            to = %saved.status,
            "ticket transitioned"
        );
        Ok(saved)
    }

    /// Staff-only removal of a ticket with its comments and restoration
    /// history.
    ///
    /// # Errors
    ///
    /// `NotFound` or `PermissionDenied`.
    pub fn delete_ticket(&self, actor: &Actor, id: TicketId) -> Result<()> {
        let ticket = self.load_ticket(id)?;
        self.enforce(actor, Operation::Delete, Resource::Ticket(&ticket))?;
        self.store.delete_ticket(id)?;
        info!(ticket = %id, actor = %actor, "ticket deleted");
        Ok(())
    }

    /// Staff see every ticket matching `filter`; anyone else only their own,
    /// whatever owner the filter names.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` for anonymous actors.
    pub fn list_tickets(&self, actor: &Actor, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        self.enforce(actor, Operation::Read, Resource::Tickets)?;
        let mut scoped = filter.clone();
        if let Some(identity) = actor.identity().filter(|identity| !identity.staff) {
            scoped.owner = Some(identity.id.clone());
        }
        self.store.list_tickets(&scoped)
    }

    /// # Errors
    ///
    /// `PermissionDenied` for anyone but staff.
    pub fn list_restoration_requests(
        &self,
        actor: &Actor,
        filter: &RestorationFilter,
    ) -> Result<Vec<RestorationRequest>> {
        self.enforce(actor, Operation::Read, Resource::Restorations)?;
        self.store.restoration_requests(filter)
    }
}
