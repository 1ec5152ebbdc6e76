use super::actor::ActorId;
use super::{CommentId, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discussion entry attached to a ticket while it is being processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub ticket_id: TicketId,
    pub author: ActorId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated comment ready for insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub ticket_id: TicketId,
    pub author: ActorId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl NewComment {
    #[must_use]
    pub fn into_comment(self, id: CommentId) -> Comment {
        Comment {
            id,
            ticket_id: self.ticket_id,
            author: self.author,
            text: self.text,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Order comments newest-first, breaking creation-time ties by id ascending.
pub fn sort_newest_first(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::{CommentId, NewComment, sort_newest_first};
    use crate::model::{ActorId, TicketId};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn newest_first_with_id_tiebreak() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let make = |id: i64, offset_secs: i64| {
            NewComment {
                ticket_id: TicketId(1),
                author: ActorId::new("alice"),
                text: format!("comment {id}"),
                created_at: base + Duration::seconds(offset_secs),
            }
            .into_comment(CommentId(id))
        };

        let mut comments = vec![make(1, 0), make(3, 10), make(2, 10), make(4, 5)];
        sort_newest_first(&mut comments);
        let order: Vec<i64> = comments.iter().map(|c| c.id.0).collect();
        assert_eq!(order, vec![2, 3, 4, 1]);
    }
}
