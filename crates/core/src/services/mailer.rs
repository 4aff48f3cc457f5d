//! Outbound mail transport.

use std::sync::Mutex;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use noticekit_common::{AppError, AppResult, EmailConfig};

/// Trait for sending notification email.
///
/// Core services depend on this rather than on a concrete transport, so
/// tests and development setups can swap in a recording double.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_message(
        &self,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
        from: &str,
        to: &[String],
    ) -> AppResult<()>;
}

/// SMTP mailer backed by lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build a transport from the email section of the configuration.
    pub fn from_config(config: &EmailConfig) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Mail(e.to_string()))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_message(
        &self,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
        from: &str,
        to: &[String],
    ) -> AppResult<()> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| AppError::Mail(format!("invalid from address: {e}")))?;

        let mut builder = Message::builder().from(from).subject(subject);
        for address in to {
            let mailbox: Mailbox = address
                .parse()
                .map_err(|e| AppError::Mail(format!("invalid recipient address: {e}")))?;
            builder = builder.to(mailbox);
        }

        let message = match html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                text_body.to_string(),
                html.to_string(),
            )),
            None => builder.body(text_body.to_string()),
        }
        .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        tracing::debug!(recipients = to.len(), "sent notification email");
        Ok(())
    }
}

/// A message captured by [`NoOpMailer`].
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
    pub from: String,
    pub to: Vec<String>,
}

/// Mailer that records messages instead of sending them.
///
/// Used when no SMTP transport is configured, and in tests.
#[derive(Debug, Default)]
pub struct NoOpMailer {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl NoOpMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages captured so far.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for NoOpMailer {
    async fn send_message(
        &self,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
        from: &str,
        to: &[String],
    ) -> AppResult<()> {
        tracing::debug!(subject, recipients = to.len(), "discarding email (no transport)");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(OutboundMessage {
                subject: subject.to_string(),
                text_body: text_body.to_string(),
                html_body: html_body.map(ToString::to_string),
                from: from.to_string(),
                to: to.to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_mailer_records() {
        let mailer = NoOpMailer::new();
        mailer
            .send_message(
                "Hi",
                "body",
                Some("<p>body</p>"),
                "noreply@example.com",
                &["user@example.com".to_string()],
            )
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Hi");
        assert_eq!(sent[0].to, vec!["user@example.com".to_string()]);
    }
}
