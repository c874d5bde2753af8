//! Persistence of expense documents.
//!
//! Every lookup except `insert` and `replace` is scoped to the owning user, so
//! a caller can never observe or modify another user's expenses.

use bson::{oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Client, Collection,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::schemas::{Expense, ExpensePatch, SplitDetail, UserId};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error("could not encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("malformed expense id: {0}")]
    InvalidId(#[from] bson::oid::Error),
}

#[allow(async_fn_in_trait)]
pub trait ExpenseStore {
    async fn insert(&self, expense: &Expense) -> StoreResult<()>;

    async fn find_owned(&self, id: &str, user_id: &str) -> StoreResult<Option<Expense>>;

    async fn find_by_owner(&self, user_id: &str) -> StoreResult<Vec<Expense>>;

    /// Overwrites the whole stored document with `expense`.
    async fn replace(&self, expense: &Expense) -> StoreResult<()>;

    async fn update_owned(
        &self,
        id: &str,
        user_id: &str,
        patch: &ExpensePatch,
    ) -> StoreResult<Option<Expense>>;

    /// Returns whether a document was removed.
    async fn delete_owned(&self, id: &str, user_id: &str) -> StoreResult<bool>;
}

/// An expense as laid out in the `Expenses` collection: `_id` is an ObjectId
/// and `date` a BSON date. Unknown fields such as `__v` are ignored.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpenseDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    user_id: UserId,
    amount: f64,
    category: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    split_details: Vec<SplitDetail>,
    #[serde(default)]
    amount_left_to_be_paid: f64,
}

impl TryFrom<&Expense> for ExpenseDocument {
    type Error = StoreError;

    fn try_from(expense: &Expense) -> StoreResult<Self> {
        Ok(Self {
            id: ObjectId::parse_str(&expense.id)?,
            user_id: expense.user_id.clone(),
            amount: expense.amount,
            category: expense.category.clone(),
            date: expense.date,
            description: expense.description.clone(),
            split_details: expense.split_details.clone(),
            amount_left_to_be_paid: expense.amount_left_to_be_paid,
        })
    }
}

impl From<ExpenseDocument> for Expense {
    fn from(document: ExpenseDocument) -> Self {
        Self {
            id: document.id.to_hex(),
            user_id: document.user_id,
            amount: document.amount,
            category: document.category,
            date: document.date,
            description: document.description,
            split_details: document.split_details,
            amount_left_to_be_paid: document.amount_left_to_be_paid,
        }
    }
}

/// Filter for `id` owned by `user_id`; `None` when `id` can't name a document.
fn owned_filter(id: &str, user_id: &str) -> Option<Document> {
    let id = ObjectId::parse_str(id).ok()?;
    Some(doc! { "_id": id, "userId": user_id })
}

/// `$set` fields for an edit, with the date stored as a BSON date and the
/// outstanding amount following a replaced split list.
fn patch_fields(patch: &ExpensePatch) -> StoreResult<Document> {
    let mut fields = bson::to_document(patch)?;
    if let Some(date) = patch.date {
        fields.insert("date", bson::DateTime::from_chrono(date));
    }
    if let Some(left) = patch.amount_left_to_be_paid() {
        fields.insert("amountLeftToBePaid", left);
    }
    Ok(fields)
}

pub struct MongoStore {
    expenses: Collection<ExpenseDocument>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            expenses: client.database(database).collection("Expenses"),
        })
    }
}

impl ExpenseStore for MongoStore {
    async fn insert(&self, expense: &Expense) -> StoreResult<()> {
        let document = ExpenseDocument::try_from(expense)?;
        self.expenses.insert_one(document, None).await?;
        Ok(())
    }

    async fn find_owned(&self, id: &str, user_id: &str) -> StoreResult<Option<Expense>> {
        let Some(filter) = owned_filter(id, user_id) else {
            return Ok(None);
        };
        let found = self.expenses.find_one(filter, None).await?;
        Ok(found.map(Expense::from))
    }

    async fn find_by_owner(&self, user_id: &str) -> StoreResult<Vec<Expense>> {
        let cursor = self.expenses.find(doc! { "userId": user_id }, None).await?;
        let documents: Vec<ExpenseDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(Expense::from).collect())
    }

    async fn replace(&self, expense: &Expense) -> StoreResult<()> {
        let document = ExpenseDocument::try_from(expense)?;
        self.expenses
            .replace_one(doc! { "_id": document.id }, &document, None)
            .await?;
        Ok(())
    }

    async fn update_owned(
        &self,
        id: &str,
        user_id: &str,
        patch: &ExpensePatch,
    ) -> StoreResult<Option<Expense>> {
        let Some(filter) = owned_filter(id, user_id) else {
            return Ok(None);
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .expenses
            .find_one_and_update(filter, doc! { "$set": patch_fields(patch)? }, options)
            .await?;
        Ok(updated.map(Expense::from))
    }

    async fn delete_owned(&self, id: &str, user_id: &str) -> StoreResult<bool> {
        let Some(filter) = owned_filter(id, user_id) else {
            return Ok(false);
        };
        let result = self.expenses.delete_one(filter, None).await?;
        Ok(result.deleted_count > 0)
    }
}

/// Keeps expenses in process memory; used by `STORAGE=memory` and the tests.
#[derive(Default)]
pub struct MemoryStore {
    expenses: RwLock<Vec<Expense>>,
}

impl ExpenseStore for MemoryStore {
    async fn insert(&self, expense: &Expense) -> StoreResult<()> {
        self.expenses.write().await.push(expense.clone());
        Ok(())
    }

    async fn find_owned(&self, id: &str, user_id: &str) -> StoreResult<Option<Expense>> {
        Ok(self
            .expenses
            .read()
            .await
            .iter()
            .find(|expense| expense.id == id && expense.user_id == user_id)
            .cloned())
    }

    async fn find_by_owner(&self, user_id: &str) -> StoreResult<Vec<Expense>> {
        Ok(self
            .expenses
            .read()
            .await
            .iter()
            .filter(|expense| expense.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn replace(&self, expense: &Expense) -> StoreResult<()> {
        let mut expenses = self.expenses.write().await;
        if let Some(stored) = expenses.iter_mut().find(|stored| stored.id == expense.id) {
            *stored = expense.clone();
        }
        Ok(())
    }

    async fn update_owned(
        &self,
        id: &str,
        user_id: &str,
        patch: &ExpensePatch,
    ) -> StoreResult<Option<Expense>> {
        let mut expenses = self.expenses.write().await;
        Ok(expenses
            .iter_mut()
            .find(|expense| expense.id == id && expense.user_id == user_id)
            .map(|expense| {
                patch.apply_to(expense);
                expense.clone()
            }))
    }

    async fn delete_owned(&self, id: &str, user_id: &str) -> StoreResult<bool> {
        let mut expenses = self.expenses.write().await;
        let before = expenses.len();
        expenses.retain(|expense| !(expense.id == id && expense.user_id == user_id));
        Ok(expenses.len() < before)
    }
}
