use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

use crate::database::models::{AlertLedgerEntry, Category, Expense, User};

/*
This file contains the SQL for the user, expense and alert-ledger tables.
Amounts are stored as TEXT and parsed back into Decimal so that currency
math never passes through floating point.
 */

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let text: String = row.get(column);
    Decimal::from_str(&text).map_err(|e| {
        sqlx::Error::Decode(format!("invalid decimal in column {column}: {e}").into())
    })
}

fn category_column(row: &SqliteRow, column: &str) -> Result<Category, sqlx::Error> {
    let text: String = row.get(column);
    text.parse::<Category>()
        .map_err(|e| sqlx::Error::Decode(e.to_string().into()))
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        user_id: row.get("user_id"),
        name: row.get("name"),
        email: row.get("email"),
        salary: decimal_column(row, "salary")?,
        user_created_at: row.get("user_created_at"),
    })
}

fn expense_from_row(row: &SqliteRow) -> Result<Expense, sqlx::Error> {
    Ok(Expense {
        expense_id: row.get("expense_id"),
        user_id: row.get("user_id"),
        category: category_column(row, "category")?,
        amount: decimal_column(row, "amount")?,
        description: row.get("description"),
        spent_at: row.get("spent_at"),
        expense_created_at: row.get("expense_created_at"),
    })
}

/*==========User Queries=========== */

// Create user
pub async fn create_user(
    pool: &Pool<Sqlite>,
    name: &str,
    email: &str,
    salary: Decimal,
) -> Result<i64, sqlx::Error> {
    let now = Local::now().naive_local();

    let row = sqlx::query(
        r#"
        INSERT INTO users (name, email, salary, user_created_at)
        VALUES (?, ?, ?, ?)
        RETURNING user_id
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(salary.to_string())
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row.get("user_id"))
}

// Get user by id; None when the row does not exist
pub async fn get_user_by_id(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT user_id, name, email, salary, user_created_at
        FROM users
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

// Get all users (the per-tick snapshot of active users)
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT user_id, name, email, salary, user_created_at
        FROM users
        ORDER BY user_id ASC
        "#,
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(user_from_row)
    .collect()
}

/*==========Expense Queries=========== */

// Create expense
pub async fn create_expense(
    pool: &Pool<Sqlite>,
    user_id: i64,
    category: Category,
    amount: Decimal,
    description: Option<&str>,
    spent_at: NaiveDateTime,
) -> Result<i64, sqlx::Error> {
    let now = Local::now().naive_local();

    let row = sqlx::query(
        r#"
        INSERT INTO expenses (user_id, category, amount, description, spent_at, expense_created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING expense_id
        "#,
    )
    .bind(user_id)
    .bind(category.as_str())
    .bind(amount.to_string())
    .bind(description)
    .bind(spent_at)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row.get("expense_id"))
}

// All expenses of one user, newest first
pub async fn get_expenses_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT expense_id, user_id, category, amount, description, spent_at, expense_created_at
        FROM expenses
        WHERE user_id = ?
        ORDER BY spent_at DESC, expense_id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(expense_from_row)
    .collect()
}

// Expenses of one user inside a half-open window: spent_at in [start, end)
pub async fn get_expenses_in_window(
    pool: &Pool<Sqlite>,
    user_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT expense_id, user_id, category, amount, description, spent_at, expense_created_at
        FROM expenses
        WHERE user_id = ? AND spent_at >= ? AND spent_at < ?
        ORDER BY spent_at ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?
    .iter()
    .map(expense_from_row)
    .collect()
}

/*==========Alert Ledger Queries=========== */

pub async fn has_alert_entry(
    pool: &Pool<Sqlite>,
    user_id: i64,
    period: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM alert_log WHERE user_id = ? AND period = ?
        ) AS present
        "#,
    )
    .bind(user_id)
    .bind(period)
    .fetch_one(pool)
    .await?;

    let present: i64 = row.get("present");
    Ok(present != 0)
}

// Idempotent: the (user_id, period) primary key makes a repeat insert a
// no-op. Returns whether a new row was actually written.
pub async fn insert_alert_entry(
    pool: &Pool<Sqlite>,
    user_id: i64,
    period: &str,
    sent_at: NaiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO alert_log (user_id, period, sent_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(period)
    .bind(sent_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_alert_entries_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<AlertLedgerEntry>, sqlx::Error> {
    sqlx::query_as::<_, AlertLedgerEntry>(
        r#"
        SELECT user_id, period, sent_at
        FROM alert_log
        WHERE user_id = ?
        ORDER BY period ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

// Period keys sort lexicographically ("2025-12" < "2026-01"), so a plain
// text comparison prunes everything before the cutoff.
pub async fn delete_alert_entries_before(
    pool: &Pool<Sqlite>,
    cutoff_period: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM alert_log
        WHERE period < ?
        "#,
    )
    .bind(cutoff_period)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
