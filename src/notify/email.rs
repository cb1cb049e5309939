use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use super::{scan_keys_over, EmailTransport};
use crate::{
    config::SmtpConfig,
    errors::{NotifyError, StoreError},
    store::MetricStore,
    utils::format_usd,
};

pub const EMAIL_SUBJECT: &str = "Uniswap High Volume Pairs";

/// Authenticated SMTP submission over implicit TLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();

        Ok(Self {
            transport,
            from: config.user.parse()?,
            to: config.recipient.parse()?,
        })
    }
}

#[async_trait]
impl EmailTransport for SmtpMailer {
    async fn send_email(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        let response = self.transport.send(email).await?;
        info!(target: "uni-volume::notify", "email sent: {}", response.code());

        Ok(())
    }
}

/// Plain-text body listing every `key: $value` over the threshold.
pub fn compose_email(threshold: f64, over: &[(String, f64)]) -> String {
    let lines = over
        .iter()
        .map(|(key, value)| format!("{key}: ${}", format_usd(*value)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "The following pairs have volumes greater than ${}:\n\n{}",
        format_usd(threshold),
        lines
    )
}

/// Compares every stored value, whatever its metric, directly against the
/// threshold and mails the ones above it in a single message.
pub struct EmailNotifier {
    store: Arc<dyn MetricStore>,
    transport: Arc<dyn EmailTransport>,
    threshold: f64,
}

impl EmailNotifier {
    pub fn new(store: Arc<dyn MetricStore>, transport: Arc<dyn EmailTransport>, threshold: f64) -> Self {
        Self { store, transport, threshold }
    }

    /// Returns how many emails went out (zero or one).
    pub async fn notify(&self) -> Result<usize, StoreError> {
        let over = scan_keys_over(self.store.as_ref(), self.threshold).await?;
        if over.is_empty() {
            return Ok(0);
        }

        let body = compose_email(self.threshold, &over);
        match self.transport.send_email(EMAIL_SUBJECT, &body).await {
            Ok(()) => Ok(1),
            Err(e) => {
                error!(target: "uni-volume::notify", "error sending email - {:?}", e);
                Ok(0)
            }
        }
    }
}
