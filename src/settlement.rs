use bson::oid::ObjectId;
use chrono::Utc;

use crate::auth::Identity;
use crate::schemas::{Expense, NewExpense, SplitDetail};

const ANONYMOUS: &str = "Anonymous";
const SELF_NAME: &str = "You";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettlementError {
    #[error("Status already updated")]
    AlreadyInState,

    #[error("Split detail {index} does not exist (expense has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Builds a new expense with its split list fully materialized.
///
/// Every participant owes an equal share, the initiator included. The
/// initiator's own entry comes last and is already settled.
pub fn create_expense(new: NewExpense, initiator: &Identity) -> Expense {
    let participants = if new.split_with.is_empty() {
        1
    } else {
        new.split_with.len() + 1
    };
    let share = new.amount / participants as f64;

    let mut split_details = new
        .split_with
        .into_iter()
        .map(|person| SplitDetail {
            user_id: person.user_id.filter(|id| !id.is_empty()),
            name: person
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| ANONYMOUS.to_string()),
            share,
            has_paid: false,
        })
        .collect::<Vec<_>>();
    let amount_left_to_be_paid: f64 = split_details.iter().map(|detail| detail.share).sum();

    split_details.push(SplitDetail {
        user_id: Some(initiator.user_id.clone()),
        name: initiator
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| SELF_NAME.to_string()),
        share,
        has_paid: true,
    });

    Expense {
        id: ObjectId::new().to_hex(),
        user_id: initiator.user_id.clone(),
        amount: new.amount,
        category: new.category,
        date: new.date.unwrap_or_else(Utc::now),
        description: new.description,
        split_details,
        amount_left_to_be_paid,
    }
}

/// Flips the settlement flag of the split detail at `index` and moves its
/// share out of (or back into) the expense's outstanding amount.
pub fn set_paid_status(
    expense: &mut Expense,
    index: usize,
    has_paid: bool,
) -> Result<(), SettlementError> {
    let len = expense.split_details.len();
    let detail = expense
        .split_details
        .get_mut(index)
        .ok_or(SettlementError::IndexOutOfRange { index, len })?;

    if detail.has_paid == has_paid {
        return Err(SettlementError::AlreadyInState);
    }

    if has_paid {
        expense.amount_left_to_be_paid -= detail.share;
        expense.amount -= detail.share;
    } else {
        expense.amount_left_to_be_paid += detail.share;
        expense.amount += detail.share;
    }
    detail.has_paid = has_paid;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Participant;

    fn alice() -> Identity {
        Identity {
            user_id: "alice-id".to_string(),
            name: Some("Alice".to_string()),
        }
    }

    fn new_expense(amount: f64, split_with: Vec<Participant>) -> NewExpense {
        NewExpense {
            amount,
            category: "Food".to_string(),
            date: None,
            description: None,
            split_with,
        }
    }

    fn named(name: &str) -> Participant {
        Participant {
            user_id: None,
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn splits_between_bob_and_alice() {
        let expense = create_expense(new_expense(300.0, vec![named("Bob")]), &alice());
        assert_eq!(expense.split_details.len(), 2);
        assert_eq!(
            expense.split_details[0],
            SplitDetail {
                user_id: None,
                name: "Bob".to_string(),
                share: 150.0,
                has_paid: false,
            }
        );
        assert_eq!(
            expense.split_details[1],
            SplitDetail {
                user_id: Some("alice-id".to_string()),
                name: "Alice".to_string(),
                share: 150.0,
                has_paid: true,
            }
        );
        assert_eq!(expense.amount, 300.0);
        assert_eq!(expense.amount_left_to_be_paid, 150.0);
        assert_eq!(expense.user_id, "alice-id");
    }

    #[test]
    fn solo_expense_has_only_the_initiator() {
        let anonymous = Identity {
            user_id: "u".to_string(),
            name: None,
        };
        let expense = create_expense(new_expense(42.0, vec![]), &anonymous);
        assert_eq!(expense.split_details.len(), 1);
        assert_eq!(expense.split_details[0].name, "You");
        assert_eq!(expense.split_details[0].share, 42.0);
        assert!(expense.split_details[0].has_paid);
        assert_eq!(expense.amount_left_to_be_paid, 0.0);
    }

    #[test]
    fn unnamed_participants_are_anonymous() {
        let expense = create_expense(
            new_expense(90.0, vec![Participant::default(), named("Carol")]),
            &alice(),
        );
        let names: Vec<_> = expense.split_details.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Anonymous", "Carol", "Alice"]);
        assert!(expense.split_details.iter().all(|d| d.share == 30.0));
        assert_eq!(expense.split_details.iter().filter(|d| d.has_paid).count(), 1);
    }

    #[test]
    fn empty_strings_count_as_unspecified() {
        let blank = Participant {
            user_id: Some(String::new()),
            name: Some(String::new()),
        };
        let unnamed_initiator = Identity {
            user_id: "u".to_string(),
            name: Some(String::new()),
        };
        let expense = create_expense(new_expense(20.0, vec![blank]), &unnamed_initiator);
        assert_eq!(expense.split_details[0].name, "Anonymous");
        assert_eq!(expense.split_details[0].user_id, None);
        assert_eq!(expense.split_details[1].name, "You");
    }

    #[test]
    fn marking_paid_reduces_amount() {
        let mut expense = create_expense(new_expense(300.0, vec![named("Bob")]), &alice());
        set_paid_status(&mut expense, 0, true).unwrap();
        assert_eq!(expense.amount, 150.0);
        assert_eq!(expense.amount_left_to_be_paid, 0.0);
        assert!(expense.split_details[0].has_paid);
    }

    #[test]
    fn redundant_transition_is_rejected_without_changes() {
        let mut expense = create_expense(new_expense(300.0, vec![named("Bob")]), &alice());
        set_paid_status(&mut expense, 0, true).unwrap();
        let before = expense.clone();
        assert_eq!(
            set_paid_status(&mut expense, 0, true),
            Err(SettlementError::AlreadyInState)
        );
        assert_eq!(expense, before);
        // The initiator starts out settled.
        assert_eq!(
            set_paid_status(&mut expense, 1, true),
            Err(SettlementError::AlreadyInState)
        );
    }

    #[test]
    fn paid_then_unpaid_restores_amount() {
        let mut expense = create_expense(
            new_expense(100.0, vec![named("Bob"), named("Carol")]),
            &alice(),
        );
        let original = expense.amount;
        set_paid_status(&mut expense, 1, true).unwrap();
        set_paid_status(&mut expense, 1, false).unwrap();
        assert!((expense.amount - original).abs() < 1e-9);
        assert!(!expense.split_details[1].has_paid);
    }

    proptest::proptest! {
        #[test]
        fn every_participant_gets_an_equal_share(
            amount in 0.0f64..100_000.0,
            k in 0usize..12,
        ) {
            let expense = create_expense(
                new_expense(amount, (0..k).map(|i| named(&format!("p{i}"))).collect()),
                &alice(),
            );
            proptest::prop_assert_eq!(expense.split_details.len(), k + 1);
            let share = amount / (k + 1) as f64;
            proptest::prop_assert!(expense.split_details.iter().all(|d| d.share == share));
            proptest::prop_assert_eq!(expense.split_details.iter().filter(|d| d.has_paid).count(), 1);
            proptest::prop_assert!(expense.split_details[k].has_paid);
        }
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut expense = create_expense(new_expense(10.0, vec![]), &alice());
        assert_eq!(
            set_paid_status(&mut expense, 3, true),
            Err(SettlementError::IndexOutOfRange { index: 3, len: 1 })
        );
    }
}
