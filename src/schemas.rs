use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = String;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: UserId,
    pub amount: f64,
    pub category: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub split_details: Vec<SplitDetail>,
    // Mirrors the unpaid shares; `amount` is what the aggregations read.
    #[serde(default)]
    pub amount_left_to_be_paid: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitDetail {
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub name: String,
    pub share: f64,
    #[serde(default)]
    pub has_paid: bool,
}

/// Someone an expense is split with, as sent by the client.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub split_with: Vec<Participant>,
}

impl NewExpense {
    /// Rejects input the split arithmetic cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if !self.amount.is_finite() {
            return Err("amount must be a finite number".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("category is required".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub expense_id: String,
    pub detail_index: usize,
    pub has_paid: bool,
}

/// Fields an owner may overwrite through an edit. Absent fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_details: Option<Vec<SplitDetail>>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.description.is_none()
            && self.split_details.is_none()
    }

    /// Outstanding amount implied by a replacement split list, if one is set.
    pub fn amount_left_to_be_paid(&self) -> Option<f64> {
        self.split_details.as_ref().map(|details| {
            details
                .iter()
                .filter(|detail| !detail.has_paid)
                .map(|detail| detail.share)
                .sum()
        })
    }

    pub fn apply_to(&self, expense: &mut Expense) {
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(category) = &self.category {
            expense.category = category.clone();
        }
        if let Some(date) = self.date {
            expense.date = date;
        }
        if let Some(description) = &self.description {
            expense.description = Some(description.clone());
        }
        if let Some(split_details) = &self.split_details {
            expense.split_details = split_details.clone();
        }
        if let Some(left) = self.amount_left_to_be_paid() {
            expense.amount_left_to_be_paid = left;
        }
    }
}
