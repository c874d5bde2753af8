//! Spending analytics over one user's expenses.

use std::collections::HashMap;

use serde::ser::{Serialize, Serializer};

use crate::schemas::Expense;

/// Sums keyed by label, kept in the order labels were first seen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Breakdown {
    entries: Vec<(String, f64)>,
    index: HashMap<String, usize>,
}

impl Breakdown {
    pub fn add(&mut self, key: String, amount: f64) {
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1 += amount,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, amount));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.index.get(key).map(|&position| self.entries[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(key, amount)| (key.as_str(), *amount))
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, amount)| amount).sum()
    }

    /// Largest entry; on ties the earliest key wins.
    pub fn highest(&self) -> Option<(&str, f64)> {
        self.pick(|candidate, current| candidate > current)
    }

    /// Smallest entry; on ties the earliest key wins.
    pub fn lowest(&self) -> Option<(&str, f64)> {
        self.pick(|candidate, current| candidate < current)
    }

    fn pick(&self, replaces: impl Fn(f64, f64) -> bool) -> Option<(&str, f64)> {
        self.iter().fold(None, |best, (key, amount)| match best {
            Some((_, current)) if !replaces(amount, current) => best,
            _ => Some((key, amount)),
        })
    }
}

impl Serialize for Breakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CategoryExtremum {
    pub category: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DateExtremum {
    pub date: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub total_amount: f64,
    pub category_wise: Breakdown,
    pub date_wise: Breakdown,
    pub monthly_wise: Breakdown,
    pub highest_category: Option<CategoryExtremum>,
    pub lowest_category: Option<CategoryExtremum>,
    pub highest_date: Option<DateExtremum>,
    pub lowest_date: Option<DateExtremum>,
}

/// Totals per category, in the order categories first appear.
pub fn category_totals(expenses: &[Expense]) -> Breakdown {
    let mut breakdown = Breakdown::default();
    for expense in expenses {
        breakdown.add(expense.category.clone(), expense.amount);
    }
    breakdown
}

pub fn analyze(expenses: &[Expense]) -> Analysis {
    let total_amount = expenses.iter().map(|expense| expense.amount).sum();
    let category_wise = category_totals(expenses);

    let mut date_wise = Breakdown::default();
    let mut monthly_wise = Breakdown::default();
    for expense in expenses {
        date_wise.add(expense.date.format("%Y-%m-%d").to_string(), expense.amount);
        monthly_wise.add(expense.date.format("%Y-%m").to_string(), expense.amount);
    }

    let category = |(key, amount): (&str, f64)| CategoryExtremum {
        category: key.to_string(),
        amount,
    };
    let date = |(key, amount): (&str, f64)| DateExtremum {
        date: key.to_string(),
        amount,
    };

    Analysis {
        total_amount,
        highest_category: category_wise.highest().map(category),
        lowest_category: category_wise.lowest().map(category),
        highest_date: date_wise.highest().map(date),
        lowest_date: date_wise.lowest().map(date),
        category_wise,
        date_wise,
        monthly_wise,
    }
}
