use chrono::NaiveDateTime;
use sqlx::FromRow;

/// Row of `alert_log`: proof that a low-balance alert was delivered to this
/// user for this period. At most one row per (user_id, period).
#[derive(FromRow, Debug, Clone)]
pub struct AlertLedgerEntry {
    pub user_id: i64,
    pub period: String, // "YYYY-MM"
    pub sent_at: NaiveDateTime,
}
