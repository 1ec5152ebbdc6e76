use super::TicketId;
use super::actor::ActorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Ticket urgency chosen by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// The six workflow states a ticket moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Active,
    InProcess,
    InRestoration,
    Declined,
    Approved,
    Done,
}

impl Status {
    pub const ALL: [Self; 6] = [
        Self::Active,
        Self::InProcess,
        Self::InRestoration,
        Self::Declined,
        Self::Approved,
        Self::Done,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::InProcess => "in-process",
            Self::InRestoration => "in-restoration",
            Self::Declined => "declined",
            Self::Approved => "approved",
            Self::Done => "done",
        }
    }

    /// States that must carry a non-empty `decline_reason`.
    #[must_use]
    pub const fn requires_decline_reason(self) -> bool {
        matches!(self, Self::Declined)
    }

    /// The state in which the owner's restoration request is pending.
    #[must_use]
    pub const fn is_restoration_pending(self) -> bool {
        matches!(self, Self::InRestoration)
    }

    /// The only state in which comments may be written.
    #[must_use]
    pub const fn is_open_for_discussion(self) -> bool {
        matches!(self, Self::InProcess)
    }
}

/// A support request and its workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub owner: ActorId,
    pub topic: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub decline_reason: String,
    pub restore_request: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Starts at 1 and grows by one with every committed write.
    pub version: u32,
}

impl Ticket {
    #[must_use]
    pub fn is_owned_by(&self, id: &ActorId) -> bool {
        self.owner == *id
    }

    /// Check the reason/flag invariants that every stored ticket satisfies.
    ///
    /// - `decline_reason` is non-empty iff the status requires one
    /// - `restore_request` is set iff a restoration is pending
    ///
    /// # Errors
    ///
    /// Returns a short description of the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        let has_reason = !self.decline_reason.trim().is_empty();
        if has_reason != self.status.requires_decline_reason() {
            return Err(if has_reason {
                "decline_reason set outside the declined state"
            } else {
                "declined ticket without a decline_reason"
            });
        }
        if self.restore_request != self.status.is_restoration_pending() {
            return Err(if self.restore_request {
                "restore_request set outside the in-restoration state"
            } else {
                "in-restoration ticket without restore_request"
            });
        }
        Ok(())
    }
}

/// A validated creation request; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub owner: ActorId,
    pub topic: String,
    pub description: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl NewTicket {
    /// Every ticket starts active with blank reasons and no restoration flag.
    #[must_use]
    pub fn into_ticket(self, id: TicketId) -> Ticket {
        Ticket {
            id,
            owner: self.owner,
            topic: self.topic,
            description: self.description,
            priority: self.priority,
            status: Status::Active,
            decline_reason: String::new(),
            restore_request: false,
            created_at: self.created_at,
            updated_at: self.created_at,
            version: 1,
        }
    }
}

/// Filter criteria for ticket listings, combined with AND semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub owner: Option<ActorId>,
}

impl TicketFilter {
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.is_none_or(|status| ticket.status == status)
            && self.priority.is_none_or(|priority| ticket.priority == priority)
            && self.owner.as_ref().is_none_or(|owner| ticket.owner == *owner)
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase and drop separators so `InProcess`, `in-process` and
/// `in_process` all compare equal.
pub(crate) fn normalize(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "active" => Ok(Self::Active),
            "inprocess" => Ok(Self::InProcess),
            "inrestoration" => Ok(Self::InRestoration),
            "declined" => Ok(Self::Declined),
            "approved" => Ok(Self::Approved),
            "done" => Ok(Self::Done),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}
