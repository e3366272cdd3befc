use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use super::Category;

/// One expense record. Immutable once created; the alert pipeline only ever
/// reads these.
#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub expense_id: i64,
    pub user_id: i64,
    pub category: Category,
    pub amount: Decimal, // stored as TEXT in SQLite
    pub description: Option<String>,
    pub spent_at: NaiveDateTime,
    pub expense_created_at: NaiveDateTime,
}
