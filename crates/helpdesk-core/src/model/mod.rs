//! Helpdesk entities: tickets, comments, restoration requests and the
//! identities acting on them.

pub mod actor;
pub mod comment;
pub mod payload;
pub mod restoration;
pub mod ticket;

use serde::{Deserialize, Serialize};
use std::{fmt, num::ParseIntError, str::FromStr};

/// Store-assigned ticket identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub i64);

/// Store-assigned comment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub i64);

/// Store-assigned restoration request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestorationId(pub i64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RestorationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts `12` as well as the `#12` spelling used in human output.
fn parse_numeric_id(s: &str) -> Result<i64, ParseIntError> {
    let trimmed = s.trim();
    trimmed.strip_prefix('#').unwrap_or(trimmed).parse()
}

impl FromStr for TicketId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_numeric_id(s).map(Self)
    }
}

impl FromStr for CommentId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_numeric_id(s).map(Self)
    }
}

pub use actor::{Actor, ActorId, Identity};
pub use comment::{Comment, NewComment};
pub use payload::Payload;
pub use restoration::{
    RestorationChange, RestorationFilter, RestorationOutcome, RestorationRequest,
};
pub use ticket::{NewTicket, ParseEnumError, Priority, Status, Ticket, TicketFilter};

#[cfg(test)]
mod tests {
    use super::{CommentId, TicketId};

    #[test]
    fn ids_parse_with_or_without_hash() {
        assert_eq!("12".parse::<TicketId>().ok(), Some(TicketId(12)));
        assert_eq!(" #12 ".parse::<TicketId>().ok(), Some(TicketId(12)));
        assert_eq!("#3".parse::<CommentId>().ok(), Some(CommentId(3)));
        assert!("abc".parse::<TicketId>().is_err());
        assert!("#".parse::<CommentId>().is_err());
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        assert_eq!(serde_json::to_string(&TicketId(42)).ok().as_deref(), Some("42"));
    }
}
