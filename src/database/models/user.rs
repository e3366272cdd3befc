use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub salary: Decimal, // monthly, stored as TEXT in SQLite
    pub user_created_at: NaiveDateTime,
}
