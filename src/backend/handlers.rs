use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::alerts::aggregator::{self, CategoryTotal};
use crate::alerts::scheduler::TickOutcome;
use crate::backend::AppState;
use crate::database::db::queries;
use crate::database::models::Category;
use crate::error::PipelineError;
use crate::period::Period;

// Authentication lives in front of this service; the auth layer forwards
// the caller's identity in this header.
const USER_HEADER: &str = "x-user-id";

fn caller_id(headers: &HeaderMap) -> Option<i64> {
    headers.get(USER_HEADER)?.to_str().ok()?.parse().ok()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Missing or invalid X-User-Id header" })),
    )
        .into_response()
}

/*==========Users=========== */

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub salary: Decimal,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> Response {
    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Name and email are required" })),
        )
            .into_response();
    }
    if payload.salary < Decimal::ZERO {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Salary must not be negative" })),
        )
            .into_response();
    }

    match queries::create_user(&state.db, &payload.name, &payload.email, payload.salary).await {
        Ok(user_id) => (StatusCode::CREATED, Json(json!({ "userId": user_id }))).into_response(),
        Err(e) => {
            error!(error = %e, "create user failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error creating user" })),
            )
                .into_response()
        }
    }
}

pub async fn get_user(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    match queries::get_user_by_id(&state.db, user_id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "User not found" })),
        )
            .into_response(),
        Err(e) => {
            error!(user_id, error = %e, "get user failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error fetching user" })),
            )
                .into_response()
        }
    }
}

/*==========Expenses=========== */

#[derive(Debug, Deserialize)]
pub struct CreateExpense {
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub spent_at: Option<NaiveDateTime>,
}

pub async fn add_expense(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateExpense>,
) -> Response {
    let Some(user_id) = caller_id(&headers) else {
        return unauthorized();
    };

    let Ok(category) = payload.category.parse::<Category>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Category and amount are required" })),
        )
            .into_response();
    };
    if payload.amount <= Decimal::ZERO {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Amount must be positive" })),
        )
            .into_response();
    }

    let spent_at = payload
        .spent_at
        .unwrap_or_else(|| Local::now().naive_local());

    match queries::create_expense(
        &state.db,
        user_id,
        category,
        payload.amount,
        payload.description.as_deref(),
        spent_at,
    )
    .await
    {
        Ok(expense_id) => (
            StatusCode::CREATED,
            Json(json!({ "expenseId": expense_id })),
        )
            .into_response(),
        Err(e) => {
            error!(user_id, error = %e, "add expense failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error adding expense" })),
            )
                .into_response()
        }
    }
}

pub async fn list_expenses(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user_id) = caller_id(&headers) else {
        return unauthorized();
    };

    match queries::get_expenses_for_user(&state.db, user_id).await {
        Ok(expenses) => (StatusCode::OK, Json(expenses)).into_response(),
        Err(e) => {
            error!(user_id, error = %e, "list expenses failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error fetching expenses" })),
            )
                .into_response()
        }
    }
}

/*==========Dashboard Stats=========== */

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub monthly_expenses: Vec<CategoryTotal>,
    pub total_expenses: Decimal,
    pub remaining_balance: Decimal,
    pub balance_percentage: Decimal,
    pub salary: Decimal,
}

/// Current-period summary for the dashboard. Goes straight through the
/// aggregator; the alert ledger and notifier are not involved.
pub async fn get_stats(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user_id) = caller_id(&headers) else {
        return unauthorized();
    };

    let period = Period::current_local();
    match aggregator::compute_stats(&state.db, user_id, period).await {
        Ok(result) => {
            let balance_percentage = result.remaining_percentage().unwrap_or(Decimal::ZERO);
            let response = StatsResponse {
                monthly_expenses: result.monthly_expenses,
                total_expenses: result.total_expenses,
                remaining_balance: result.remaining_balance,
                balance_percentage,
                salary: result.salary,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(PipelineError::UserNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "User not found" })),
        )
            .into_response(),
        Err(e) => {
            error!(user_id, error = %e, "stats query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error fetching expense statistics" })),
            )
                .into_response()
        }
    }
}

/*==========Manual Trigger=========== */

/// Admin endpoint: run one balance-check tick right now. Subject to the
/// same overlap guard as the daily timer.
pub async fn run_alerts(State(state): State<AppState>) -> Response {
    match state.runner.run_tick().await {
        TickOutcome::Completed(summary) => (
            StatusCode::OK,
            Json(json!({ "status": "completed", "summary": summary })),
        )
            .into_response(),
        TickOutcome::AlreadyRunning => (
            StatusCode::CONFLICT,
            Json(json!({ "status": "already-running" })),
        )
            .into_response(),
    }
}
