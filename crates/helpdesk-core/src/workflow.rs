//! Ticket status workflow.
//!
//! ```text
//!              approve (staff)            start-process (staff)        complete (staff)
//!   Active ─────────────────────▶ Approved ─────────────────▶ InProcess ─────────────▶ Done
//!     │                              ▲
//!     │ decline (staff, reason)      │ approve (staff)
//!     ▼                              │
//!   Declined ──restore (owner)──▶ InRestoration
//!     ▲                              │
//!     └──────decline (staff, reason)─┘
//! ```
//!
//! Functions here are pure: they compute the next ticket and the restoration
//! side effect, and the store commits both with compare-and-set on the
//! version the computation started from.

use crate::error::{HelpdeskError, Result};
use crate::model::ticket::normalize;
use crate::model::{
    Actor, Identity, NewTicket, Payload, ParseEnumError, Priority, RestorationChange,
    RestorationOutcome, Status, Ticket,
};
use crate::policy::DenyReason;
use crate::validate::{self, Limits};
use chrono::{DateTime, Utc};
use std::{fmt, str::FromStr};

/// Who may fire a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRequirement {
    Staff,
    Owner,
}

impl ActorRequirement {
    /// # Errors
    ///
    /// Returns the denial reason when `identity` does not qualify.
    pub fn check(self, identity: &Identity, ticket: &Ticket) -> Result<(), DenyReason> {
        match self {
            Self::Staff if identity.staff => Ok(()),
            Self::Staff => Err(DenyReason::StaffOnly),
            Self::Owner if ticket.is_owned_by(&identity.id) => Ok(()),
            Self::Owner => Err(DenyReason::OwnerOnly),
        }
    }
}

/// A named status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Decline,
    Approve,
    Restore,
    StartProcess,
    Complete,
}

impl Transition {
    pub const ALL: [Self; 5] = [
        Self::Decline,
        Self::Approve,
        Self::Restore,
        Self::StartProcess,
        Self::Complete,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decline => "decline",
            Self::Approve => "approve",
            Self::Restore => "restore",
            Self::StartProcess => "start-process",
            Self::Complete => "complete",
        }
    }

    /// States this transition may fire from.
    #[must_use]
    pub const fn sources(self) -> &'static [Status] {
        match self {
            Self::Decline | Self::Approve => &[Status::Active, Status::InRestoration],
            Self::Restore => &[Status::Declined],
            Self::StartProcess => &[Status::Approved],
            Self::Complete => &[Status::InProcess],
        }
    }

    #[must_use]
    pub const fn target(self) -> Status {
        match self {
            Self::Decline => Status::Declined,
            Self::Approve => Status::Approved,
            Self::Restore => Status::InRestoration,
            Self::StartProcess => Status::InProcess,
            Self::Complete => Status::Done,
        }
    }

    #[must_use]
    pub const fn requirement(self) -> ActorRequirement {
        match self {
            Self::Restore => ActorRequirement::Owner,
            Self::Decline | Self::Approve | Self::StartProcess | Self::Complete => {
                ActorRequirement::Staff
            }
        }
    }

    /// Payload fields the transition accepts.
    #[must_use]
    pub const fn payload_fields(self) -> &'static [&'static str] {
        match self {
            Self::Decline => &["decline_reason"],
            Self::Approve | Self::Restore | Self::StartProcess | Self::Complete => &[],
        }
    }

    #[must_use]
    pub fn can_fire_from(self, status: Status) -> bool {
        self.sources().contains(&status)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transition {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "decline" => Ok(Self::Decline),
            "approve" => Ok(Self::Approve),
            "restore" => Ok(Self::Restore),
            "startprocess" | "start" | "inprocess" => Ok(Self::StartProcess),
            "complete" | "done" => Ok(Self::Complete),
            _ => Err(ParseEnumError {
                expected: "transition",
                got: s.to_string(),
            }),
        }
    }
}

/// Result of a successful transition, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub ticket: Ticket,
    pub restoration: RestorationChange,
}

fn identity_of(actor: &Actor) -> Result<&Identity> {
    actor.identity().ok_or(HelpdeskError::PermissionDenied {
        reason: DenyReason::Unauthenticated,
    })
}

/// Compute the effect of `transition` on `ticket`.
///
/// Checks run in a fixed order: actor requirement, then source state, then
/// payload. `decline` needs a non-empty `decline_reason`; `restore` moves the
/// current reason into a new restoration request; `approve` and `decline`
/// from `InRestoration` resolve that request.
///
/// # Errors
///
/// `PermissionDenied`, `InvalidStateTransition` or `Validation`, in that
/// precedence.
pub fn apply(
    actor: &Actor,
    ticket: &Ticket,
    transition: Transition,
    payload: &Payload,
    limits: &Limits,
    now: DateTime<Utc>,
) -> Result<Applied> {
    let identity = identity_of(actor)?;
    transition
        .requirement()
        .check(identity, ticket)
        .map_err(|reason| reason.into_error(transition.as_str()))?;

    if !transition.can_fire_from(ticket.status) {
        return Err(HelpdeskError::InvalidStateTransition {
            ticket: ticket.id,
            current: ticket.status,
            requested: Some(transition.target()),
            attempted: transition.as_str(),
        });
    }

    if let Some(field) = payload.first_outside(transition.payload_fields()) {
        return Err(HelpdeskError::validation(
            field,
            format!("is not accepted by {transition}"),
        ));
    }

    let mut next = ticket.clone();
    next.status = transition.target();
    next.updated_at = now;

    let restoration = match transition {
        Transition::Decline => {
            let reason = payload.get("decline_reason").ok_or_else(|| {
                HelpdeskError::validation("decline_reason", "is required to decline")
            })?;
            next.decline_reason = limits.decline_reason(reason)?;
            next.restore_request = false;
            resolve_pending(ticket, RestorationOutcome::Declined, now)
        }
        Transition::Approve => {
            next.restore_request = false;
            resolve_pending(ticket, RestorationOutcome::Approved, now)
        }
        Transition::Restore => {
            next.restore_request = true;
            RestorationChange::Open {
                decline_reason: std::mem::take(&mut next.decline_reason),
                at: now,
            }
        }
        Transition::StartProcess | Transition::Complete => RestorationChange::Unchanged,
    };

    next.check_invariants()
        .map_err(|detail| HelpdeskError::Invariant {
            ticket: ticket.id,
            detail,
        })?;

    Ok(Applied {
        ticket: next,
        restoration,
    })
}

fn resolve_pending(ticket: &Ticket, outcome: RestorationOutcome, now: DateTime<Utc>) -> RestorationChange {
    if ticket.status.is_restoration_pending() {
        RestorationChange::Resolve { outcome, at: now }
    } else {
        RestorationChange::Unchanged
    }
}

/// Build a new ticket request for `actor`.
///
/// # Errors
///
/// `PermissionDenied` for anonymous actors, `Validation` for bad topic or
/// description.
pub fn open(
    actor: &Actor,
    topic: &str,
    description: &str,
    priority: Priority,
    limits: &Limits,
    now: DateTime<Utc>,
) -> Result<NewTicket> {
    let identity = identity_of(actor)?;
    Ok(NewTicket {
        owner: identity.id.clone(),
        topic: limits.topic(topic)?,
        description: limits.description(description)?,
        priority,
        created_at: now,
    })
}

/// Apply an owner's partial update of `description` and `priority`.
///
/// Who may edit is the access policy's call; this only enforces that the
/// ticket is still active and that values are well formed.
///
/// # Errors
///
/// `InvalidStateTransition` when the ticket is not active, `Validation` for
/// an empty payload, unknown fields or bad values.
pub fn edit(ticket: &Ticket, payload: &Payload, limits: &Limits, now: DateTime<Utc>) -> Result<Ticket> {
    if ticket.status != Status::Active {
        return Err(HelpdeskError::InvalidStateTransition {
            ticket: ticket.id,
            current: ticket.status,
            requested: None,
            attempted: "edit",
        });
    }
    if payload.is_empty() {
        return Err(HelpdeskError::validation("payload", "no fields to update"));
    }

    let mut next = ticket.clone();
    for field in payload.field_names() {
        let value = payload.get(field).unwrap_or_default();
        match field {
            "description" => next.description = limits.description(value)?,
            "priority" => next.priority = validate::priority(value)?,
            other => {
                return Err(HelpdeskError::validation(other, "is not editable"));
            }
        }
    }
    next.updated_at = now;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::{ActorRequirement, Transition, apply, edit, open};
    use crate::error::HelpdeskError;
    use crate::model::{
        Actor, ActorId, NewTicket, Payload, Priority, RestorationChange, RestorationOutcome,
        Status, Ticket, TicketId,
    };
    use crate::policy::DenyReason;
    use crate::validate::Limits;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::str::FromStr;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn active() -> Ticket {
        NewTicket {
            owner: ActorId::new("ursula"),
            topic: "Email bounce".to_string(),
            description: "Messages to finance bounce".to_string(),
            priority: Priority::Medium,
            created_at: t0(),
        }
        .into_ticket(TicketId(3))
    }

    fn staff() -> Actor {
        Actor::staff("sam")
    }

    fn owner() -> Actor {
        Actor::user("ursula")
    }

    fn fire(actor: &Actor, ticket: &Ticket, transition: Transition, payload: &Payload) -> super::Result<super::Applied> {
        apply(actor, ticket, transition, payload, &Limits::default(), t0() + Duration::minutes(1))
    }

    fn reason(text: &str) -> Payload {
        Payload::new().with("decline_reason", text)
    }

    /// Drive a fresh ticket into `status` through legal transitions.
    fn ticket_in(status: Status) -> Ticket {
        let mut ticket = active();
        let path: &[(Transition, bool)] = match status {
            Status::Active => &[],
            Status::Declined => &[(Transition::Decline, false)],
            Status::InRestoration => &[(Transition::Decline, false), (Transition::Restore, true)],
            Status::Approved => &[(Transition::Approve, false)],
            Status::InProcess => &[(Transition::Approve, false), (Transition::StartProcess, false)],
            Status::Done => &[
                (Transition::Approve, false),
                (Transition::StartProcess, false),
                (Transition::Complete, false),
            ],
        };
        for (transition, by_owner) in path {
            let actor = if *by_owner { owner() } else { staff() };
            let payload = if *transition == Transition::Decline {
                reason("duplicate")
            } else {
                Payload::new()
            };
            ticket = fire(&actor, &ticket, *transition, &payload).unwrap().ticket;
        }
        assert_eq!(ticket.status, status);
        ticket
    }

    #[test]
    fn transition_table_is_total() {
        for status in Status::ALL {
            for transition in Transition::ALL {
                let ticket = ticket_in(status);
                let actor = match transition.requirement() {
                    ActorRequirement::Staff => staff(),
                    ActorRequirement::Owner => owner(),
                };
                let payload = if transition == Transition::Decline {
                    reason("not reproducible")
                } else {
                    Payload::new()
                };
                let result = fire(&actor, &ticket, transition, &payload);
                if transition.can_fire_from(status) {
                    let applied = result.unwrap();
                    assert_eq!(applied.ticket.status, transition.target());
                    assert!(applied.ticket.check_invariants().is_ok());
                } else {
                    assert!(
                        matches!(
                            result,
                            Err(HelpdeskError::InvalidStateTransition { current, requested: Some(to), .. })
                                if current == status && to == transition.target()
                        ),
                        "{transition} from {status} should be rejected"
                    );
                }
            }
        }
    }

    #[test]
    fn decline_records_reason_and_clears_flag() {
        let applied = fire(&staff(), &active(), Transition::Decline, &reason("  spam ")).unwrap();
        assert_eq!(applied.ticket.status, Status::Declined);
        assert_eq!(applied.ticket.decline_reason, "spam");
        assert!(!applied.ticket.restore_request);
        assert_eq!(applied.restoration, RestorationChange::Unchanged);
    }

    #[test]
    fn decline_without_reason_is_validation_error() {
        for payload in [Payload::new(), reason(""), reason("   ")] {
            let err = fire(&staff(), &active(), Transition::Decline, &payload).unwrap_err();
            assert!(
                matches!(err, HelpdeskError::Validation { ref field, .. } if field == "decline_reason"),
                "{err:?}"
            );
        }
    }

    #[test]
    fn actor_is_checked_before_state() {
        let done = ticket_in(Status::Done);
        let err = fire(&owner(), &done, Transition::Approve, &Payload::new()).unwrap_err();
        assert!(matches!(
            err,
            HelpdeskError::PermissionDenied {
                reason: DenyReason::StaffOnly
            }
        ));

        let err = fire(&staff(), &ticket_in(Status::Declined), Transition::Restore, &Payload::new())
            .unwrap_err();
        assert!(matches!(
            err,
            HelpdeskError::PermissionDenied {
                reason: DenyReason::OwnerOnly
            }
        ));

        let err = fire(&Actor::Anonymous, &active(), Transition::Approve, &Payload::new()).unwrap_err();
        assert!(matches!(
            err,
            HelpdeskError::PermissionDenied {
                reason: DenyReason::Unauthenticated
            }
        ));
    }

    #[test]
    fn restore_moves_reason_into_restoration_request() {
        let declined = ticket_in(Status::Declined);
        assert_eq!(declined.decline_reason, "duplicate");

        let applied = fire(&owner(), &declined, Transition::Restore, &Payload::new()).unwrap();
        assert_eq!(applied.ticket.status, Status::InRestoration);
        assert!(applied.ticket.restore_request);
        assert!(applied.ticket.decline_reason.is_empty());
        assert!(matches!(
            applied.restoration,
            RestorationChange::Open { ref decline_reason, .. } if decline_reason == "duplicate"
        ));
    }

    #[test]
    fn leaving_restoration_resolves_the_request() {
        let pending = ticket_in(Status::InRestoration);

        let approved = fire(&staff(), &pending, Transition::Approve, &Payload::new()).unwrap();
        assert_eq!(approved.ticket.status, Status::Approved);
        assert!(!approved.ticket.restore_request);
        assert!(approved.ticket.decline_reason.is_empty());
        assert!(matches!(
            approved.restoration,
            RestorationChange::Resolve {
                outcome: RestorationOutcome::Approved,
                ..
            }
        ));

        let declined = fire(&staff(), &pending, Transition::Decline, &reason("still spam")).unwrap();
        assert_eq!(declined.ticket.decline_reason, "still spam");
        assert!(!declined.ticket.restore_request);
        assert!(matches!(
            declined.restoration,
            RestorationChange::Resolve {
                outcome: RestorationOutcome::Declined,
                ..
            }
        ));
    }

    #[test]
    fn unexpected_payload_fields_are_rejected() {
        let payload = Payload::new().with("priority", "high");
        let err = fire(&staff(), &active(), Transition::Approve, &payload).unwrap_err();
        assert!(matches!(err, HelpdeskError::Validation { ref field, .. } if field == "priority"));
    }

    #[test]
    fn transition_names_parse() {
        assert_eq!(Transition::from_str("start-process").unwrap(), Transition::StartProcess);
        assert_eq!(Transition::from_str("start").unwrap(), Transition::StartProcess);
        assert_eq!(Transition::from_str("Done").unwrap(), Transition::Complete);
        for transition in Transition::ALL {
            assert_eq!(Transition::from_str(transition.as_str()).unwrap(), transition);
        }
        assert!(Transition::from_str("reject").is_err());
    }

    #[test]
    fn open_validates_and_starts_active() {
        let draft = open(&owner(), " Wifi ", "Drops hourly", Priority::High, &Limits::default(), t0()).unwrap();
        assert_eq!(draft.topic, "Wifi");
        assert_eq!(draft.owner, ActorId::new("ursula"));
        let ticket = draft.into_ticket(TicketId(1));
        assert_eq!(ticket.status, Status::Active);

        assert!(open(&Actor::Anonymous, "x", "y", Priority::Low, &Limits::default(), t0()).is_err());
        assert!(matches!(
            open(&owner(), "", "y", Priority::Low, &Limits::default(), t0()),
            Err(HelpdeskError::Validation { .. })
        ));
    }

    #[test]
    fn edit_updates_allowed_fields_while_active() {
        let payload = Payload::new()
            .with("priority", "high")
            .with("description", "Now also affects HR");
        let edited = edit(&active(), &payload, &Limits::default(), t0() + Duration::hours(1)).unwrap();
        assert_eq!(edited.priority, Priority::High);
        assert_eq!(edited.description, "Now also affects HR");
        assert_eq!(edited.status, Status::Active);
        assert!(edited.updated_at > edited.created_at);

        let err = edit(&ticket_in(Status::Approved), &payload, &Limits::default(), t0()).unwrap_err();
        assert!(matches!(
            err,
            HelpdeskError::InvalidStateTransition {
                attempted: "edit",
                ..
            }
        ));

        let err = edit(&active(), &Payload::new().with("priority", "asap"), &Limits::default(), t0())
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::Validation { ref field, .. } if field == "priority"));
        assert!(edit(&active(), &Payload::new(), &Limits::default(), t0()).is_err());
    }
}
