//! Restoration requests: the record an owner opens when asking staff to
//! reconsider a declined ticket.

use super::{RestorationId, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ticket::ParseEnumError;

/// How staff resolved a restoration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestorationOutcome {
    Approved,
    Declined,
}

impl RestorationOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for RestorationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestorationOutcome {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            _ => Err(ParseEnumError {
                expected: "restoration outcome",
                got: s.to_string(),
            }),
        }
    }
}

/// One restoration attempt for a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorationRequest {
    pub id: RestorationId,
    pub ticket_id: TicketId,
    /// The decline reason being contested, moved off the ticket on restore.
    pub decline_reason: String,
    pub requested_at: DateTime<Utc>,
    pub outcome: Option<RestorationOutcome>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl RestorationRequest {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.outcome.is_none()
    }
}

/// Selects restoration requests for listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestorationFilter {
    pub pending_only: bool,
    pub ticket: Option<TicketId>,
}

impl RestorationFilter {
    #[must_use]
    pub fn matches(&self, request: &RestorationRequest) -> bool {
        (!self.pending_only || request.is_pending())
            && self.ticket.is_none_or(|ticket| request.ticket_id == ticket)
    }
}

/// Restoration side effect committed together with a ticket write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RestorationChange {
    #[default]
    Unchanged,
    /// Open a new pending request for the written ticket.
    Open {
        decline_reason: String,
        at: DateTime<Utc>,
    },
    /// Resolve the ticket's pending request.
    Resolve {
        outcome: RestorationOutcome,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::{RestorationFilter, RestorationOutcome, RestorationRequest};
    use crate::model::{RestorationId, TicketId};
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    #[test]
    fn filter_selects_pending_and_ticket() {
        let at = Utc.with_ymd_and_hms(2024, 2, 2, 12, 0, 0).unwrap();
        let mut request = RestorationRequest {
            id: RestorationId(1),
            ticket_id: TicketId(4),
            decline_reason: "duplicate".to_string(),
            requested_at: at,
            outcome: None,
            resolved_at: None,
        };
        let pending = RestorationFilter {
            pending_only: true,
            ticket: None,
        };
        assert!(pending.matches(&request));
        assert!(
            !RestorationFilter {
                ticket: Some(TicketId(5)),
                ..RestorationFilter::default()
            }
            .matches(&request)
        );

        request.outcome = Some(RestorationOutcome::Approved);
        request.resolved_at = Some(at);
        assert!(!pending.matches(&request));
        assert!(RestorationFilter::default().matches(&request));
    }

    #[test]
    fn outcome_parse_roundtrips() {
        for outcome in [RestorationOutcome::Approved, RestorationOutcome::Declined] {
            assert_eq!(
                RestorationOutcome::from_str(&outcome.to_string()).unwrap(),
                outcome
            );
        }
        assert!(RestorationOutcome::from_str("pending").is_err());
    }
}
