use std::collections::HashMap;

use serde::Serialize;

use crate::config::BalanceKey;
use crate::schemas::{Expense, SplitDetail};

type Balance = HashMap<String, f64>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummary {
    pub expenses: Vec<Expense>,
    /// Gross amount minus what participants still owe
    pub total_amount_spent: f64,
    pub total_amount_left_to_be_paid: f64,
    pub individual_balances: Balance,
}

fn balance_key(detail: &SplitDetail, key: BalanceKey) -> String {
    match (key, &detail.user_id) {
        (BalanceKey::Identity, Some(user_id)) => user_id.clone(),
        _ => detail.name.clone(),
    }
}

pub fn compute_individual_balances(expenses: &[Expense], key: BalanceKey) -> Balance {
    let mut balance = Balance::new();
    for detail in expenses
        .iter()
        .flat_map(|expense| &expense.split_details)
        .filter(|detail| !detail.has_paid)
    {
        balance
            .entry(balance_key(detail, key))
            .and_modify(|v| *v += detail.share)
            .or_insert(detail.share);
    }
    balance
}

pub fn summarize(expenses: Vec<Expense>, key: BalanceKey) -> ExpenseSummary {
    let total_amount: f64 = expenses.iter().map(|expense| expense.amount).sum();
    let total_amount_left_to_be_paid: f64 = expenses
        .iter()
        .flat_map(|expense| &expense.split_details)
        .filter(|detail| !detail.has_paid)
        .map(|detail| detail.share)
        .sum();
    let individual_balances = compute_individual_balances(&expenses, key);

    ExpenseSummary {
        total_amount_spent: total_amount - total_amount_left_to_be_paid,
        total_amount_left_to_be_paid,
        individual_balances,
        expenses,
    }
}
