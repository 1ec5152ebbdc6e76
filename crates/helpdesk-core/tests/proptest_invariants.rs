use chrono::{Duration, TimeZone, Utc};
use helpdesk_core::clock::SteppingClock;
use helpdesk_core::model::{Actor, Payload, Priority, Status, TicketFilter};
use helpdesk_core::workflow::{ActorRequirement, Transition};
use helpdesk_core::{Helpdesk, HelpdeskError, MemoryStore};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Who {
    Owner,
    Stranger,
    Staff,
}

impl Who {
    fn actor(self) -> Actor {
        match self {
            Self::Owner => Actor::user("ursula"),
            Self::Stranger => Actor::user("mallory"),
            Self::Staff => Actor::staff("sam"),
        }
    }
}

#[derive(Debug, Clone)]
enum Step {
    Fire {
        who: Who,
        transition: Transition,
        reason: Option<String>,
    },
    Edit {
        who: Who,
        priority: Priority,
    },
    Comment {
        who: Who,
        text: String,
    },
}

fn arb_who() -> impl Strategy<Value = Who> {
    prop_oneof![Just(Who::Owner), Just(Who::Stranger), Just(Who::Staff)]
}

fn arb_transition() -> impl Strategy<Value = Transition> {
    proptest::sample::select(Transition::ALL.to_vec())
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    proptest::sample::select(Priority::ALL.to_vec())
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (arb_who(), arb_transition(), proptest::option::of("[ a-z]{0,12}")).prop_map(
            |(who, transition, reason)| Step::Fire {
                who,
                transition,
                reason,
            }
        ),
        1 => (arb_who(), arb_priority()).prop_map(|(who, priority)| Step::Edit { who, priority }),
        1 => (arb_who(), "[a-z]{1,20}").prop_map(|(who, text)| Step::Comment { who, text }),
    ]
}

fn desk() -> Helpdesk<MemoryStore, SteppingClock> {
    Helpdesk::with_clock(
        MemoryStore::new(),
        SteppingClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Duration::seconds(1),
        ),
    )
}

fn meets(who: Who, transition: Transition) -> bool {
    match transition.requirement() {
        ActorRequirement::Staff => matches!(who, Who::Staff),
        ActorRequirement::Owner => matches!(who, Who::Owner),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Reason and flag invariants hold after every step, and every failed
    /// step leaves the ticket exactly as it was.
    #[test]
    fn invariants_hold_after_any_sequence(steps in proptest::collection::vec(arb_step(), 1..40)) {
        let desk = desk();
        let owner = Who::Owner.actor();
        let staff = Who::Staff.actor();
        let ticket = desk.create_ticket(&owner, "Laptop", "Battery swells", Priority::Low).unwrap();

        for step in steps {
            let before = desk.get_ticket(&staff, ticket.id).unwrap();
            let result = match &step {
                Step::Fire { who, transition, reason } => {
                    let payload = reason
                        .as_ref()
                        .map_or_else(Payload::new, |text| Payload::new().with("decline_reason", text.as_str()));
                    desk.transition_ticket(&who.actor(), ticket.id, *transition, &payload).map(|_| ())
                }
                Step::Edit { who, priority } => desk
                    .edit_ticket(&who.actor(), ticket.id, &Payload::new().with("priority", priority.as_str()))
                    .map(|_| ()),
                Step::Comment { who, text } => desk
                    .create_comment(&who.actor(), ticket.id, text)
                    .map(|_| ()),
            };

            let after = desk.get_ticket(&staff, ticket.id).unwrap();
            prop_assert!(after.check_invariants().is_ok(), "{:?} broke {:?}", step, after);
            if result.is_err() {
                prop_assert_eq!(&after, &before);
            }
            let pending = desk
                .list_restoration_requests(&staff, &helpdesk_core::model::RestorationFilter {
                    pending_only: true,
                    ticket: Some(ticket.id),
                })
                .unwrap();
            prop_assert_eq!(pending.len(), usize::from(after.status == Status::InRestoration));
        }
    }

    /// A transition succeeds exactly when the table, the actor requirement
    /// and the payload all allow it.
    #[test]
    fn transitions_follow_the_table(steps in proptest::collection::vec((arb_who(), arb_transition()), 1..30)) {
        let desk = desk();
        let owner = Who::Owner.actor();
        let staff = Who::Staff.actor();
        let ticket = desk.create_ticket(&owner, "Printer", "Out of toner", Priority::High).unwrap();

        for (who, transition) in steps {
            let before = desk.get_ticket(&staff, ticket.id).unwrap();
            let payload = if transition == Transition::Decline {
                Payload::new().with("decline_reason", "not in scope")
            } else {
                Payload::new()
            };
            let result = desk.transition_ticket(&who.actor(), ticket.id, transition, &payload);

            let visible = !matches!(who, Who::Stranger);
            let expected_ok = visible && meets(who, transition) && transition.can_fire_from(before.status);
            prop_assert_eq!(result.is_ok(), expected_ok, "{:?} {} from {}", who, transition, before.status);

            match result {
                Ok(after) => prop_assert_eq!(after.status, transition.target()),
                Err(HelpdeskError::InvalidStateTransition { current, requested, .. }) => {
                    prop_assert!(visible && meets(who, transition));
                    prop_assert_eq!(current, before.status);
                    prop_assert_eq!(requested, Some(transition.target()));
                }
                Err(HelpdeskError::PermissionDenied { .. }) => {
                    prop_assert!(!visible || !meets(who, transition));
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}

#[test]
fn listing_never_leaks_other_owners() {
    let desk = desk();
    for owner in ["ann", "bob", "cy"] {
        desk.create_ticket(&Actor::user(owner), "Access", "Badge broken", Priority::Low)
            .unwrap();
    }
    for owner in ["ann", "bob", "cy"] {
        let actor = Actor::user(owner);
        let mine = desk.list_tickets(&actor, &TicketFilter::default()).unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine.iter().all(|ticket| ticket.owner.as_str() == owner));
    }
}
