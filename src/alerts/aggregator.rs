use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries;
use crate::database::models::Category;
use crate::error::PipelineError;
use crate::period::Period;

/// Spending in one category over one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: Decimal,
    pub count: u32,
}

/// Monthly spending summary for one user. Derived, never persisted:
/// recomputed fresh on every read so a failed background tick can never
/// leave stale numbers behind.
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub user_id: i64,
    pub period: Period,
    pub salary: Decimal,
    pub monthly_expenses: Vec<CategoryTotal>,
    pub total_expenses: Decimal,
    pub remaining_balance: Decimal,
}

impl AggregateResult {
    /// `remaining_balance / salary * 100`. `None` when the salary is zero
    /// (or negative): the percentage is undefined there, which the caller
    /// must treat as non-alertable rather than as an error.
    pub fn remaining_percentage(&self) -> Option<Decimal> {
        if self.salary > Decimal::ZERO {
            Some(self.remaining_balance / self.salary * Decimal::ONE_HUNDRED)
        } else {
            None
        }
    }
}

/// Computes the per-category totals, grand total and remaining balance for
/// one user and one period. Categories without expenses in the window are
/// omitted. An empty expense set is not an error: the whole salary remains.
pub async fn compute_stats(
    pool: &Pool<Sqlite>,
    user_id: i64,
    period: Period,
) -> Result<AggregateResult, PipelineError> {
    let user = queries::get_user_by_id(pool, user_id)
        .await?
        .ok_or(PipelineError::UserNotFound(user_id))?;

    let expenses =
        queries::get_expenses_in_window(pool, user_id, period.start(), period.next_start()).await?;

    // The sums stay in Decimal from start to finish. SQLite's SUM() would
    // coerce the TEXT amounts into floats, so the fold happens here instead.
    let mut by_category: BTreeMap<Category, (Decimal, u32)> = BTreeMap::new();
    for expense in &expenses {
        let slot = by_category
            .entry(expense.category)
            .or_insert((Decimal::ZERO, 0));
        slot.0 += expense.amount;
        slot.1 += 1;
    }

    let monthly_expenses: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category,
            total,
            count,
        })
        .collect();

    let total_expenses: Decimal = monthly_expenses.iter().map(|c| c.total).sum();
    let remaining_balance = user.salary - total_expenses;

    Ok(AggregateResult {
        user_id,
        period,
        salary: user.salary,
        monthly_expenses,
        total_expenses,
        remaining_balance,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn test_pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn period() -> Period {
        Period::containing(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap())
    }

    async fn seed_expense(pool: &Pool<Sqlite>, user_id: i64, category: Category, amount: &str) {
        let spent_at = NaiveDate::from_ymd_opt(2026, 8, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        queries::create_expense(pool, user_id, category, dec(amount), None, spent_at)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn groups_by_category_and_sums_exactly() {
        let pool = test_pool().await;
        let user_id = queries::create_user(&pool, "Priya", "priya@example.com", dec("50000"))
            .await
            .unwrap();
        seed_expense(&pool, user_id, Category::Food, "3000").await;
        seed_expense(&pool, user_id, Category::Food, "2000").await;
        seed_expense(&pool, user_id, Category::Transport, "40500").await;

        let result = compute_stats(&pool, user_id, period()).await.unwrap();

        assert_eq!(
            result.monthly_expenses,
            vec![
                CategoryTotal {
                    category: Category::Food,
                    total: dec("5000"),
                    count: 2,
                },
                CategoryTotal {
                    category: Category::Transport,
                    total: dec("40500"),
                    count: 1,
                },
            ]
        );
        assert_eq!(result.total_expenses, dec("45500"));
        assert_eq!(result.remaining_balance, dec("4500"));
        assert_eq!(result.remaining_percentage(), Some(dec("9.00")));
    }

    #[tokio::test]
    async fn empty_month_leaves_full_salary() {
        let pool = test_pool().await;
        let user_id = queries::create_user(&pool, "Arjun", "arjun@example.com", dec("42000.50"))
            .await
            .unwrap();

        let result = compute_stats(&pool, user_id, period()).await.unwrap();

        assert!(result.monthly_expenses.is_empty());
        assert_eq!(result.total_expenses, Decimal::ZERO);
        assert_eq!(result.remaining_balance, dec("42000.50"));
        assert_eq!(result.remaining_percentage(), Some(dec("100")));
    }

    #[tokio::test]
    async fn window_excludes_next_month_start() {
        let pool = test_pool().await;
        let user_id = queries::create_user(&pool, "Meera", "meera@example.com", dec("50000"))
            .await
            .unwrap();
        let p = period();
        // Dated exactly at the next month's first instant: next period's.
        queries::create_expense(&pool, user_id, Category::Bills, dec("999"), None, p.next_start())
            .await
            .unwrap();
        // Dated exactly at the period start: this period's.
        queries::create_expense(&pool, user_id, Category::Bills, dec("100"), None, p.start())
            .await
            .unwrap();

        let result = compute_stats(&pool, user_id, p).await.unwrap();

        assert_eq!(result.total_expenses, dec("100"));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let pool = test_pool().await;

        let err = compute_stats(&pool, 4242, period()).await.unwrap_err();

        assert!(matches!(err, PipelineError::UserNotFound(4242)));
    }

    #[tokio::test]
    async fn zero_salary_has_no_percentage() {
        let pool = test_pool().await;
        let user_id = queries::create_user(&pool, "Nil", "nil@example.com", Decimal::ZERO)
            .await
            .unwrap();

        let result = compute_stats(&pool, user_id, period()).await.unwrap();

        assert_eq!(result.remaining_percentage(), None);
    }
}
