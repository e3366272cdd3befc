use std::sync::Arc;

use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use personal_finance_alerts::alerts::mailer::SmtpMailer;
use personal_finance_alerts::alerts::notifier::Notifier;
use personal_finance_alerts::alerts::scheduler::PipelineRunner;
use personal_finance_alerts::backend;
use personal_finance_alerts::config::Config;
use personal_finance_alerts::database::db::{connection, migrate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        eprintln!("tracing init failed: {e}");
    }

    let config = Config::from_env()?;

    let pool = connection::get_db_pool(&config.database_url).await?;
    migrate::run_migrations(&pool).await?;

    let mailer = SmtpMailer::new(
        &config.smtp.host,
        config.smtp.port,
        config.smtp.username.clone(),
        config.smtp.password.clone(),
        config.smtp.from.clone(),
    )?;
    let notifier = Notifier::new(Arc::new(mailer), &config.frontend_url, config.send_timeout);
    let runner = Arc::new(PipelineRunner::new(
        pool.clone(),
        notifier,
        config.worker_limit,
        config.query_timeout,
    ));

    // Daily balance check, e.g. at 09:00 local.
    tokio::spawn(Arc::clone(&runner).run_daily(config.alert_time));

    backend::run_server(config.bind_addr, pool, runner).await
}
