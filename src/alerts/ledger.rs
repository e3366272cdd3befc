use chrono::Local;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries;
use crate::period::Period;

/// Tracks which (user, period) pairs have already received a low-balance
/// alert, so a persisting condition produces one email per month instead of
/// one per tick. Only successful deliveries are recorded; a failed send
/// leaves no entry and stays retryable on the next tick.
///
/// Ticks are serialized by the runner's Idle/Running guard and each tick
/// visits a user at most once, so no two workers ever race on one key. The
/// (user_id, period) primary key makes `record_sent` idempotent at the
/// storage level regardless.
#[derive(Clone)]
pub struct AlertLedger {
    pool: Pool<Sqlite>,
}

impl AlertLedger {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn has_sent(&self, user_id: i64, period: Period) -> Result<bool, sqlx::Error> {
        queries::has_alert_entry(&self.pool, user_id, &period.key()).await
    }

    pub async fn record_sent(&self, user_id: i64, period: Period) -> Result<(), sqlx::Error> {
        let sent_at = Local::now().naive_local();
        queries::insert_alert_entry(&self.pool, user_id, &period.key(), sent_at).await?;
        Ok(())
    }

    /// Drops entries older than the cutoff period. New periods start clean
    /// anyway; this just keeps the table from growing forever.
    pub async fn prune_before(&self, cutoff: Period) -> Result<u64, sqlx::Error> {
        queries::delete_alert_entries_before(&self.pool, &cutoff.key()).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
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

    fn period(y: i32, m: u32) -> Period {
        Period::containing(NaiveDate::from_ymd_opt(y, m, 1).unwrap())
    }

    async fn seed_user(pool: &Pool<Sqlite>) -> i64 {
        queries::create_user(pool, "Priya", "priya@example.com", Decimal::from(50000))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn has_sent_flips_after_record() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let ledger = AlertLedger::new(pool);
        let p = period(2026, 8);

        assert!(!ledger.has_sent(user_id, p).await.unwrap());
        ledger.record_sent(user_id, p).await.unwrap();
        assert!(ledger.has_sent(user_id, p).await.unwrap());
    }

    #[tokio::test]
    async fn recording_twice_keeps_a_single_entry() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let ledger = AlertLedger::new(pool.clone());
        let p = period(2026, 8);

        ledger.record_sent(user_id, p).await.unwrap();
        ledger.record_sent(user_id, p).await.unwrap();

        let entries = queries::get_alert_entries_for_user(&pool, user_id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].period, "2026-08");
    }

    #[tokio::test]
    async fn a_new_period_starts_unsent() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let ledger = AlertLedger::new(pool);

        ledger.record_sent(user_id, period(2026, 8)).await.unwrap();

        assert!(!ledger.has_sent(user_id, period(2026, 9)).await.unwrap());
    }

    #[tokio::test]
    async fn prune_drops_only_older_periods() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let ledger = AlertLedger::new(pool.clone());

        ledger.record_sent(user_id, period(2025, 6)).await.unwrap();
        ledger.record_sent(user_id, period(2025, 12)).await.unwrap();
        ledger.record_sent(user_id, period(2026, 8)).await.unwrap();

        let dropped = ledger.prune_before(period(2026, 1)).await.unwrap();

        assert_eq!(dropped, 2);
        let entries = queries::get_alert_entries_for_user(&pool, user_id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].period, "2026-08");
    }
}
