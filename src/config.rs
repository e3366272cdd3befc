use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;

/// Runtime configuration, read once at startup from the environment
/// (`dotenvy` has already loaded `.env` by then).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Local wall-clock time of the daily balance check, e.g. "09:00".
    pub alert_time: NaiveTime,
    /// Upper bound on concurrent per-user pipeline workers within one tick.
    pub worker_limit: usize,
    pub query_timeout: Duration,
    pub send_timeout: Duration,
    pub smtp: SmtpConfig,
    pub frontend_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let alert_time_raw = env::var("ALERT_TIME").unwrap_or_else(|_| "09:00".to_string());
        let alert_time = NaiveTime::parse_from_str(&alert_time_raw, "%H:%M")
            .with_context(|| format!("ALERT_TIME must look like 09:00, got {alert_time_raw}"))?;

        let worker_limit = parse_or("ALERT_WORKER_LIMIT", 8).max(1);
        let query_timeout = Duration::from_secs(parse_or("ALERT_QUERY_TIMEOUT_SECS", 10));
        let send_timeout = Duration::from_secs(parse_or("ALERT_SEND_TIMEOUT_SECS", 15));

        let smtp = SmtpConfig {
            host: env::var("SMTP_HOST").context("SMTP_HOST must be set")?,
            port: parse_or("SMTP_PORT", 587),
            username: env::var("SMTP_USER").context("SMTP_USER must be set")?,
            password: env::var("SMTP_PASS").context("SMTP_PASS must be set")?,
            from: env::var("EMAIL_FROM").context("EMAIL_FROM must be set")?,
        };

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            database_url,
            bind_addr,
            alert_time,
            worker_limit,
            query_timeout,
            send_timeout,
            smtp,
            frontend_url,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
