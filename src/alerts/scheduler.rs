use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveTime};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{error, info, warn};

use crate::alerts::aggregator;
use crate::alerts::evaluator;
use crate::alerts::ledger::AlertLedger;
use crate::alerts::notifier::Notifier;
use crate::database::db::queries;
use crate::database::models::User;
use crate::error::PipelineError;
use crate::period::Period;

/// Ledger rows older than this many periods are pruned after each tick.
const LEDGER_KEEP_PERIODS: u32 = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub users_processed: usize,
    pub alerts_sent: usize,
    pub already_sent: usize,
    pub not_fired: usize,
    pub failures: usize,
}

#[derive(Debug)]
pub enum TickOutcome {
    Completed(TickSummary),
    /// A tick was already in flight; this one was rejected, not queued.
    AlreadyRunning,
}

enum UserOutcome {
    Sent,
    AlreadySent,
    NotFired,
    Failed,
}

/// Drives the balance check over all users: one snapshot of the user list
/// per tick, bounded per-user fan-out, and an Idle/Running guard so that
/// neither the timer nor the manual trigger can ever run two ticks at once.
pub struct PipelineRunner {
    pool: Pool<Sqlite>,
    ledger: AlertLedger,
    notifier: Notifier,
    worker_limit: usize,
    query_timeout: Duration,
    running: AtomicBool,
}

impl PipelineRunner {
    pub fn new(
        pool: Pool<Sqlite>,
        notifier: Notifier,
        worker_limit: usize,
        query_timeout: Duration,
    ) -> Self {
        Self {
            ledger: AlertLedger::new(pool.clone()),
            pool,
            notifier,
            worker_limit: worker_limit.max(1),
            query_timeout,
            running: AtomicBool::new(false),
        }
    }

    /// One pass over all users. Returns `AlreadyRunning` without doing any
    /// work if another tick holds the guard.
    pub async fn run_tick(&self) -> TickOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("balance check skipped: a tick is already in progress");
            return TickOutcome::AlreadyRunning;
        }

        let summary = self.tick_all_users().await;
        self.running.store(false, Ordering::Release);

        TickOutcome::Completed(summary)
    }

    async fn tick_all_users(&self) -> TickSummary {
        let period = Period::current_local();

        // Snapshot the user set once; users created mid-tick wait for the
        // next tick.
        let users = match queries::get_all_users(&self.pool).await {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "could not enumerate users, aborting tick");
                return TickSummary {
                    failures: 1,
                    ..TickSummary::default()
                };
            }
        };

        info!(period = %period, users = users.len(), "balance check tick started");

        let outcomes: Vec<UserOutcome> = stream::iter(users)
            .map(|user| self.process_user(user, period))
            .buffer_unordered(self.worker_limit)
            .collect()
            .await;

        let mut summary = TickSummary::default();
        for outcome in outcomes {
            summary.users_processed += 1;
            match outcome {
                UserOutcome::Sent => summary.alerts_sent += 1,
                UserOutcome::AlreadySent => summary.already_sent += 1,
                UserOutcome::NotFired => summary.not_fired += 1,
                UserOutcome::Failed => summary.failures += 1,
            }
        }

        if let Err(e) = self
            .ledger
            .prune_before(period.months_back(LEDGER_KEEP_PERIODS))
            .await
        {
            warn!(error = %e, "alert ledger prune failed");
        }

        info!(
            processed = summary.users_processed,
            sent = summary.alerts_sent,
            failures = summary.failures,
            "balance check tick finished"
        );

        summary
    }

    /// One user's failure never aborts the tick; it is logged with the user
    /// context and counted, and the user is retried on the next tick.
    async fn process_user(&self, user: User, period: Period) -> UserOutcome {
        let user_id = user.user_id;
        match self.check_and_notify(&user, period).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(user_id, period = %period, error = %e, "skipping user for this tick");
                UserOutcome::Failed
            }
        }
    }

    async fn check_and_notify(
        &self,
        user: &User,
        period: Period,
    ) -> Result<UserOutcome, PipelineError> {
        let stats_read = aggregator::compute_stats(&self.pool, user.user_id, period);
        let result = match tokio::time::timeout(self.query_timeout, stats_read).await {
            Ok(result) => result?,
            Err(_) => return Err(PipelineError::QueryTimeout(self.query_timeout)),
        };

        let decision = evaluator::evaluate(&result);
        if !decision.should_fire {
            return Ok(UserOutcome::NotFired);
        }

        // At most one successful send per (user, period); the ledger is only
        // written after the notifier reports success.
        if self.ledger.has_sent(user.user_id, period).await? {
            return Ok(UserOutcome::AlreadySent);
        }

        self.notifier.notify(user, &result, &decision).await?;
        self.ledger.record_sent(user.user_id, period).await?;

        info!(
            user_id = user.user_id,
            period = %period,
            percentage = %decision.percentage.round_dp(1),
            "low balance alert sent"
        );

        Ok(UserOutcome::Sent)
    }

    /// Fires a tick at the configured local wall-clock time, once a day.
    /// A tick missed across a restart is simply not run; the next scheduled
    /// one proceeds normally.
    pub async fn run_daily(self: Arc<Self>, alert_time: NaiveTime) {
        loop {
            let wait = duration_until_next(alert_time);
            info!(seconds = wait.as_secs(), "next balance check scheduled");
            tokio::time::sleep(wait).await;

            if let TickOutcome::AlreadyRunning = self.run_tick().await {
                warn!("scheduled tick found a run still in flight");
            }
        }
    }
}

fn duration_until_next(alert_time: NaiveTime) -> Duration {
    let now = Local::now().naive_local();
    let mut next = now.date().and_time(alert_time);
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}
