//! Identities acting on the helpdesk.
//!
//! Identity is owned by an external authentication collaborator; the core
//! only reads the stable id and the staff capability and never mutates them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a user (login name, subject claim, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated user together with their role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: ActorId,
    /// Elevated capability: approve, decline and progress any ticket.
    pub staff: bool,
}

/// The party behind a request, threaded explicitly into every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Authenticated(Identity),
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Self::Authenticated(Identity {
            id: ActorId::new(id),
            staff: false,
        })
    }

    pub fn staff(id: impl Into<String>) -> Self {
        Self::Authenticated(Identity {
            id: ActorId::new(id),
            staff: true,
        })
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self, Self::Authenticated(Identity { staff: true, .. }))
    }

    /// True when this actor is the authenticated user `id`.
    #[must_use]
    pub fn is(&self, id: &ActorId) -> bool {
        self.identity().is_some_and(|identity| identity.id == *id)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("<anonymous>"),
            Self::Authenticated(identity) if identity.staff => {
                write!(f, "{} (staff)", identity.id)
            }
            Self::Authenticated(identity) => write!(f, "{}", identity.id),
        }
    }
}
