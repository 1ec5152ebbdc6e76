//! Access-policy evaluator.
//!
//! [`authorize`] is a pure function of the actor, the operation and the
//! resource it targets. Operations and resources are closed enums matched
//! without wildcards, so adding either one forces a decision for every
//! combination here.
//!
//! Rule precedence (first match wins):
//! 1. anonymous actors are denied everything
//! 2. a ticket, its comments and its comment list are visible only to staff
//!    and the ticket owner; everyone else gets the same generic denial
//!    whatever the ticket state
//! 3. per-resource rules below

use crate::error::HelpdeskError;
use crate::model::{Actor, Comment, Identity, Status, Ticket, TicketId};
use crate::workflow::Transition;
use std::fmt;

/// Ticket fields an owner may change through a partial update.
pub const EDITABLE_TICKET_FIELDS: &[&str] = &["priority", "description"];

/// Fields accepted in a comment create or update payload.
pub const COMMENT_FIELDS: &[&str] = &["text"];

/// What the actor wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    /// Fetch one resource, or list a collection.
    Read,
    /// Add to a collection; `fields` are the submitted payload field names.
    Create { fields: &'a [&'a str] },
    /// Partial update; `fields` are the submitted payload field names.
    Update { fields: &'a [&'a str] },
    Delete,
    Transition(Transition),
}

impl Operation<'_> {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete => "delete",
            Self::Transition(transition) => transition.as_str(),
        }
    }
}

/// What the operation targets.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// The ticket collection (list, create).
    Tickets,
    Ticket(&'a Ticket),
    /// The comment thread of a ticket (list, create).
    Comments(&'a Ticket),
    Comment {
        ticket: &'a Ticket,
        comment: &'a Comment,
    },
    /// Restoration requests across all tickets.
    Restorations,
}

/// Why a request was refused. Carried on every denial for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    /// Neither staff nor the ticket owner.
    NotVisible,
    StaffOnly,
    OwnerOnly,
    AuthorOnly,
    /// Staff handle tickets; they do not file them.
    StaffCannotCreate,
    /// Staff change tickets only through status transitions.
    StaffCannotEdit,
    DisallowedField(String),
    WrongStatus {
        ticket: TicketId,
        current: Status,
        required: Status,
    },
    /// The operation has no meaning for the resource.
    Unsupported,
}

impl DenyReason {
    /// Stable snake_case reason code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::NotVisible => "not_visible",
            Self::StaffOnly => "staff_only",
            Self::OwnerOnly => "owner_only",
            Self::AuthorOnly => "author_only",
            Self::StaffCannotCreate => "staff_cannot_create",
            Self::StaffCannotEdit => "staff_cannot_edit",
            Self::DisallowedField(_) => "disallowed_field",
            Self::WrongStatus { .. } => "wrong_status",
            Self::Unsupported => "unsupported",
        }
    }

    /// Convert a denial of `attempted` into the caller-facing error.
    ///
    /// Disallowed fields are payload problems and wrong-status denials are
    /// lifecycle problems; everything else is a plain permission denial.
    #[must_use]
    pub fn into_error(self, attempted: &'static str) -> HelpdeskError {
        match self {
            Self::DisallowedField(field) => {
                HelpdeskError::validation(field, format!("may not be set when you {attempted}"))
            }
            Self::WrongStatus {
                ticket, current, ..
            } => HelpdeskError::InvalidStateTransition {
                ticket,
                current,
                requested: None,
                attempted,
            },
            reason => HelpdeskError::PermissionDenied { reason },
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("authentication required"),
            Self::NotVisible => f.write_str("you do not have access to this ticket"),
            Self::StaffOnly => f.write_str("only staff may do this"),
            Self::OwnerOnly => f.write_str("only the ticket owner may do this"),
            Self::AuthorOnly => f.write_str("only the comment author may do this"),
            Self::StaffCannotCreate => f.write_str("staff cannot file tickets"),
            Self::StaffCannotEdit => {
                f.write_str("staff change tickets only through status transitions")
            }
            Self::DisallowedField(field) => write!(f, "field '{field}' may not be set"),
            Self::WrongStatus {
                ticket,
                current,
                required,
            } => write!(f, "ticket {ticket} is {current}, must be {required}"),
            Self::Unsupported => f.write_str("operation not supported on this resource"),
        }
    }
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether `actor` may perform `operation` on `resource`.
///
/// Never mutates anything.
#[must_use]
pub fn authorize(
    actor: &Actor,
    operation: Operation<'_>,
    resource: Resource<'_>,
) -> Decision {
    let Some(identity) = actor.identity() else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    let verdict = match resource {
        Resource::Tickets => ticket_collection(identity, operation),
        Resource::Ticket(ticket) => single_ticket(identity, operation, ticket),
        Resource::Comments(ticket) => comment_thread(identity, operation, ticket),
        Resource::Comment { ticket, comment } => single_comment(identity, operation, ticket, comment),
        Resource::Restorations => restorations(identity, operation),
    };

    match verdict {
        Ok(()) => Decision::Allow,
        Err(reason) => Decision::Deny(reason),
    }
}

fn visible(identity: &Identity, ticket: &Ticket) -> Result<(), DenyReason> {
    if identity.staff || ticket.is_owned_by(&identity.id) {
        Ok(())
    } else {
        Err(DenyReason::NotVisible)
    }
}

fn require_status(ticket: &Ticket, required: Status) -> Result<(), DenyReason> {
    if ticket.status == required {
        Ok(())
    } else {
        Err(DenyReason::WrongStatus {
            ticket: ticket.id,
            current: ticket.status,
            required,
        })
    }
}

fn only_fields(fields: &[&str], allowed: &[&str]) -> Result<(), DenyReason> {
    match fields.iter().find(|field| !allowed.contains(*field)) {
        Some(field) => Err(DenyReason::DisallowedField((*field).to_string())),
        None => Ok(()),
    }
}

fn staff_only(identity: &Identity) -> Result<(), DenyReason> {
    if identity.staff {
        Ok(())
    } else {
        Err(DenyReason::StaffOnly)
    }
}

fn ticket_collection(identity: &Identity, operation: Operation<'_>) -> Result<(), DenyReason> {
    match operation {
        // Listing is scoped by the caller: staff see all, others their own.
        Operation::Read => Ok(()),
        Operation::Create { .. } => {
            if identity.staff {
                Err(DenyReason::StaffCannotCreate)
            } else {
                Ok(())
            }
        }
        Operation::Update { .. } | Operation::Delete | Operation::Transition(_) => {
            Err(DenyReason::Unsupported)
        }
    }
}

fn single_ticket(
    identity: &Identity,
    operation: Operation<'_>,
    ticket: &Ticket,
) -> Result<(), DenyReason> {
    visible(identity, ticket)?;
    match operation {
        Operation::Read => Ok(()),
        Operation::Create { .. } => Err(DenyReason::Unsupported),
        Operation::Update { fields } => {
            if identity.staff {
                return Err(DenyReason::StaffCannotEdit);
            }
            only_fields(fields, EDITABLE_TICKET_FIELDS)?;
            require_status(ticket, Status::Active)
        }
        Operation::Delete => staff_only(identity),
        Operation::Transition(transition) => transition.requirement().check(identity, ticket),
    }
}

fn comment_thread(
    identity: &Identity,
    operation: Operation<'_>,
    ticket: &Ticket,
) -> Result<(), DenyReason> {
    visible(identity, ticket)?;
    match operation {
        Operation::Read => Ok(()),
        Operation::Create { fields } => {
            only_fields(fields, COMMENT_FIELDS)?;
            require_status(ticket, Status::InProcess)
        }
        Operation::Update { .. } | Operation::Delete | Operation::Transition(_) => {
            Err(DenyReason::Unsupported)
        }
    }
}

fn single_comment(
    identity: &Identity,
    operation: Operation<'_>,
    ticket: &Ticket,
    comment: &Comment,
) -> Result<(), DenyReason> {
    visible(identity, ticket)?;
    let author_in_discussion = || {
        // Authorship beats the staff role here: staff cannot touch others' comments.
        if comment.author != identity.id {
            return Err(DenyReason::AuthorOnly);
        }
        require_status(ticket, Status::InProcess)
    };
    match operation {
        Operation::Read => Ok(()),
        Operation::Update { fields } => {
            author_in_discussion()?;
            only_fields(fields, COMMENT_FIELDS)
        }
        Operation::Delete => author_in_discussion(),
        Operation::Create { .. } | Operation::Transition(_) => Err(DenyReason::Unsupported),
    }
}

fn restorations(identity: &Identity, operation: Operation<'_>) -> Result<(), DenyReason> {
    match operation {
        Operation::Read => staff_only(identity),
        Operation::Create { .. }
        | Operation::Update { .. }
        | Operation::Delete
        | Operation::Transition(_) => Err(DenyReason::Unsupported),
    }
}
