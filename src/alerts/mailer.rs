use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MailError(pub String);

/// The outbound delivery capability. The notifier only sees this trait;
/// production wires in SMTP, tests wire in a recording fake.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: String,
        from: String,
    ) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError(format!("smtp transport setup failed: {e}")))?
            .credentials(Credentials::new(username, password))
            .port(port)
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| MailError(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| MailError(format!("invalid recipient address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| MailError(format!("failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError(format!("smtp send failed: {e}")))?;

        Ok(())
    }
}
