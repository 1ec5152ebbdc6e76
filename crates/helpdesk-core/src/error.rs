use crate::model::ticket::Status;
use crate::model::{CommentId, TicketId};
use crate::policy::DenyReason;
use std::fmt;

/// Machine-readable error codes for callers that branch on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    ValidationFailed,
    PermissionDenied,
    TicketNotFound,
    CommentNotFound,
    InvalidStateTransition,
    ConcurrentModification,
    StaleState,
    StorageFailure,
    InvariantViolation,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ValidationFailed => "E2001",
            Self::PermissionDenied => "E2002",
            Self::TicketNotFound => "E3001",
            Self::CommentNotFound => "E3002",
            Self::InvalidStateTransition => "E4001",
            Self::ConcurrentModification => "E4002",
            Self::StaleState => "E4003",
            Self::StorageFailure => "E5001",
            Self::InvariantViolation => "E9002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Helpdesk project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::ValidationFailed => "Invalid request payload",
            Self::PermissionDenied => "Permission denied",
            Self::TicketNotFound => "Ticket not found",
            Self::CommentNotFound => "Comment not found",
            Self::InvalidStateTransition => "Invalid state transition",
            Self::ConcurrentModification => "Ticket changed concurrently",
            Self::StaleState => "Ticket status changed before commit",
            Self::StorageFailure => "Storage failure",
            Self::InvariantViolation => "Ticket invariant violated",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `hd init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .helpdesk/config.toml and retry."),
            Self::ValidationFailed => Some("Correct the named field and resubmit."),
            Self::PermissionDenied | Self::InvariantViolation => None,
            Self::TicketNotFound => Some("Check the ticket ID with `hd list`."),
            Self::CommentNotFound => Some("Check the comment ID with `hd comment list`."),
            Self::InvalidStateTransition => Some(
                "Follow valid transitions: active -> approved -> in-process -> done, \
                 active/in-restoration -> declined -> in-restoration.",
            ),
            Self::ConcurrentModification | Self::StaleState => {
                Some("Re-read the ticket and resubmit if the change still applies.")
            }
            Self::StorageFailure => Some("Check disk space and write permissions."),
        }
    }

    /// HTTP status a web front end should answer with for this code.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::ValidationFailed | Self::InvalidStateTransition => 400,
            Self::PermissionDenied => 403,
            Self::TicketNotFound | Self::CommentNotFound => 404,
            Self::ConcurrentModification | Self::StaleState => 409,
            Self::NotInitialized
            | Self::ConfigParseError
            | Self::StorageFailure
            | Self::InvariantViolation => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The entity an id lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Ticket(TicketId),
    Comment(CommentId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ticket(id) => write!(f, "ticket {id}"),
            Self::Comment(id) => write!(f, "comment {id}"),
        }
    }
}

/// Every failure a helpdesk operation can report.
///
/// Errors are local to one call; none of them leaves a partial write behind.
#[derive(Debug, thiserror::Error)]
pub enum HelpdeskError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("permission denied: {reason}")]
    PermissionDenied { reason: DenyReason },

    #[error(
        "cannot {attempted} ticket {ticket} while it is {current}{}",
        .requested.map_or_else(String::new, |to| format!(" (requested {to})"))
    )]
    InvalidStateTransition {
        ticket: TicketId,
        current: Status,
        requested: Option<Status>,
        attempted: &'static str,
    },

    #[error("{0} not found")]
    NotFound(Missing),

    #[error(
        "ticket {ticket} changed concurrently: read {expected} at v{read_version}, \
         found {found} at v{stored_version}"
    )]
    ConcurrentModification {
        ticket: TicketId,
        expected: Status,
        found: Status,
        read_version: u32,
        stored_version: u32,
    },

    #[error("ticket {ticket} left {expected} before commit (now {found})")]
    StaleState {
        ticket: TicketId,
        expected: Status,
        found: Status,
    },

    #[error("ticket {ticket} would violate invariant: {detail}")]
    Invariant { ticket: TicketId, detail: &'static str },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl HelpdeskError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
            Self::NotFound(Missing::Ticket(_)) => ErrorCode::TicketNotFound,
            Self::NotFound(Missing::Comment(_)) => ErrorCode::CommentNotFound,
            Self::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            Self::StaleState { .. } => ErrorCode::StaleState,
            Self::Invariant { .. } => ErrorCode::InvariantViolation,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// Whether re-reading and resubmitting the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. } | Self::StaleState { .. }
        )
    }
}

pub type Result<T, E = HelpdeskError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{ErrorCode, HelpdeskError, Missing};
    use crate::model::TicketId;
    use crate::model::ticket::Status;
    use crate::policy::DenyReason;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 11] = [
        ErrorCode::NotInitialized,
        ErrorCode::ConfigParseError,
        ErrorCode::ValidationFailed,
        ErrorCode::PermissionDenied,
        ErrorCode::TicketNotFound,
        ErrorCode::CommentNotFound,
        ErrorCode::InvalidStateTransition,
        ErrorCode::ConcurrentModification,
        ErrorCode::StaleState,
        ErrorCode::StorageFailure,
        ErrorCode::InvariantViolation,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let text = code.code();
            assert_eq!(text.len(), 5);
            assert!(text.starts_with('E'));
            assert!(text.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn http_statuses_follow_the_taxonomy() {
        assert_eq!(ErrorCode::ValidationFailed.http_status(), 400);
        assert_eq!(ErrorCode::PermissionDenied.http_status(), 403);
        assert_eq!(ErrorCode::TicketNotFound.http_status(), 404);
        assert_eq!(ErrorCode::ConcurrentModification.http_status(), 409);
        assert_eq!(ErrorCode::StaleState.http_status(), 409);
    }

    #[test]
    fn invalid_transition_message_names_both_states() {
        let err = HelpdeskError::InvalidStateTransition {
            ticket: TicketId(7),
            current: Status::Done,
            requested: Some(Status::Approved),
            attempted: "approve",
        };
        assert_eq!(
            err.to_string(),
            "cannot approve ticket 7 while it is done (requested approved)"
        );
    }

    #[test]
    fn only_conflicts_are_retryable() {
        let conflict = HelpdeskError::ConcurrentModification {
            ticket: TicketId(1),
            expected: Status::Active,
            found: Status::Approved,
            read_version: 1,
            stored_version: 2,
        };
        assert!(conflict.is_retryable());
        assert_eq!(
            conflict.to_string(),
            "ticket 1 changed concurrently: read active at v1, found approved at v2"
        );
        assert!(
            !HelpdeskError::PermissionDenied {
                reason: DenyReason::StaffOnly
            }
            .is_retryable()
        );
        assert!(!HelpdeskError::NotFound(Missing::Ticket(TicketId(1))).is_retryable());
    }
}
