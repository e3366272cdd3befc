use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::alerts::aggregator::AggregateResult;
use crate::alerts::evaluator::AlertDecision;
use crate::alerts::mailer::Mailer;
use crate::database::models::User;
use crate::error::PipelineError;

/// Renders the low-balance email and hands it to the delivery capability.
/// The send is the one slow, fallible step of the pipeline, so it runs
/// under a bounded timeout; any failure is returned to the caller, which
/// must then skip the ledger write so the next tick retries.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    dashboard_url: String,
    send_timeout: Duration,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, frontend_url: &str, send_timeout: Duration) -> Self {
        Self {
            mailer,
            dashboard_url: format!("{}/dashboard", frontend_url.trim_end_matches('/')),
            send_timeout,
        }
    }

    pub async fn notify(
        &self,
        user: &User,
        result: &AggregateResult,
        decision: &AlertDecision,
    ) -> Result<(), PipelineError> {
        let percentage = format!("{:.1}", decision.percentage);
        let subject = format!("Critical: Low Balance Alert - {percentage}% Remaining");
        let body = render_body(
            &user.name,
            &format_currency(result.remaining_balance),
            &percentage,
            &self.dashboard_url,
        );

        match tokio::time::timeout(
            self.send_timeout,
            self.mailer.send(&user.email, &subject, &body),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PipelineError::Delivery(e.to_string())),
            Err(_) => Err(PipelineError::DeliveryTimeout(self.send_timeout)),
        }
    }
}

fn render_body(name: &str, balance: &str, percentage: &str, dashboard_url: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Hi {name},</h2>
  <p><strong>Your account balance is running low!</strong></p>
  <p>You have only <strong>{percentage}%</strong> of your salary remaining this month.</p>
  <p>Remaining Balance: <strong>&#8377;{balance}</strong></p>
  <p><a href="{dashboard_url}">View Dashboard</a></p>
  <p>Please review your expenses and plan accordingly.</p>
</div>"#
    )
}

/// "1234567.5" -> "1,234,567.50"
fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let text = format!("{rounded:.2}");
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, "00"),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}.{frac_part}")
}
