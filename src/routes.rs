//! HTTP surface of the expense operations, mounted under `/api/expenses`.

use actix_web::{http::header, web, HttpResponse};
use serde::Serialize;

use crate::analysis::analyze;
use crate::auth::Identity;
use crate::balance::summarize;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::report::{self, build_tables, render_xlsx};
use crate::schemas::{Expense, ExpensePatch, NewExpense, StatusUpdate};
use crate::settlement::{create_expense, set_paid_status};
use crate::store::ExpenseStore;

#[derive(Serialize)]
struct Message {
    message: &'static str,
}

#[derive(Serialize)]
struct StatusUpdated {
    message: &'static str,
    expense: Expense,
}

pub fn configure<S: ExpenseStore + 'static>(cfg: &mut web::ServiceConfig) {
    // Body and path extraction failures use the same error payload as
    // everything else.
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _| AppError::InvalidRequest(err.to_string()).into());
    let path_config = web::PathConfig::default()
        .error_handler(|err, _| AppError::InvalidRequest(err.to_string()).into());

    cfg.service(
        web::scope("/api/expenses")
            .app_data(json_config)
            .app_data(path_config)
            .route("/add", web::post().to(add_expense::<S>))
            .route("/update-status", web::put().to(update_status::<S>))
            .route("/fetch", web::get().to(fetch_expenses::<S>))
            .route("/edit/{id}", web::put().to(edit_expense::<S>))
            .route("/delete/{id}", web::delete().to(delete_expense::<S>))
            .route("/analyze", web::get().to(analyze_expenses::<S>))
            .route("/report", web::get().to(expense_report::<S>)),
    );
}

async fn add_expense<S: ExpenseStore>(
    store: web::Data<S>,
    user: Identity,
    json: web::Json<NewExpense>,
) -> AppResult<HttpResponse> {
    let new = json.into_inner();
    new.validate().map_err(AppError::InvalidRequest)?;
    let expense = create_expense(new, &user);
    store.insert(&expense).await?;
    tracing::info!(
        expense = %expense.id,
        user = %user.user_id,
        participants = expense.split_details.len(),
        "expense added"
    );
    Ok(HttpResponse::Created().json(expense))
}

async fn update_status<S: ExpenseStore>(
    store: web::Data<S>,
    user: Identity,
    json: web::Json<StatusUpdate>,
) -> AppResult<HttpResponse> {
    let update = json.into_inner();
    let mut expense = store
        .find_owned(&update.expense_id, &user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    set_paid_status(&mut expense, update.detail_index, update.has_paid)?;
    store.replace(&expense).await?;
    tracing::info!(
        expense = %expense.id,
        detail = update.detail_index,
        has_paid = update.has_paid,
        "payment status updated"
    );

    Ok(HttpResponse::Ok().json(StatusUpdated {
        message: "Payment status updated",
        expense,
    }))
}

async fn fetch_expenses<S: ExpenseStore>(
    store: web::Data<S>,
    config: web::Data<Config>,
    user: Identity,
) -> AppResult<HttpResponse> {
    let expenses = store.find_by_owner(&user.user_id).await?;
    tracing::debug!(user = %user.user_id, count = expenses.len(), "fetched expenses");
    Ok(HttpResponse::Ok().json(summarize(expenses, config.balance_key)))
}

async fn edit_expense<S: ExpenseStore>(
    store: web::Data<S>,
    user: Identity,
    id: web::Path<String>,
    json: web::Json<ExpensePatch>,
) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let patch = json.into_inner();
    let updated = if patch.is_empty() {
        store.find_owned(&id, &user.user_id).await?
    } else {
        store.update_owned(&id, &user.user_id, &patch).await?
    };
    let expense = updated.ok_or(AppError::NotFound)?;
    tracing::info!(expense = %expense.id, "expense edited");
    Ok(HttpResponse::Ok().json(expense))
}

async fn delete_expense<S: ExpenseStore>(
    store: web::Data<S>,
    user: Identity,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    if !store.delete_owned(&id, &user.user_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(expense = %id, "expense deleted");
    Ok(HttpResponse::Ok().json(Message {
        message: "Expense deleted",
    }))
}

async fn analyze_expenses<S: ExpenseStore>(
    store: web::Data<S>,
    user: Identity,
) -> AppResult<HttpResponse> {
    let expenses = store.find_by_owner(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(analyze(&expenses)))
}

async fn expense_report<S: ExpenseStore>(
    store: web::Data<S>,
    user: Identity,
) -> AppResult<HttpResponse> {
    let expenses = store.find_by_owner(&user.user_id).await?;
    let bytes = render_xlsx(&build_tables(&expenses))?;
    tracing::info!(user = %user.user_id, size = bytes.len(), "report generated");
    Ok(HttpResponse::Ok()
        .content_type(report::CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report::FILE_NAME),
        ))
        .body(bytes))
}
