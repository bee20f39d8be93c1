//! SMTP outreach client: sends rendered emails through the user's mailbox
//! with async lettre over STARTTLS.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use outreach_core::config::SmtpConfig;
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::OutreachClient;
use outreach_core::types::{Contact, RenderedEmail, SendResult};

/// Sends one email per call; holds a pooled SMTP transport.
pub struct SmtpOutreachClient {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpOutreachClient {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        if config.email.is_empty() {
            return Err(OutreachError::Config("smtp.email is not set".into()));
        }
        let from_name = config.display_name.as_deref().unwrap_or(&config.email);
        let from: Mailbox = format!("{from_name} <{}>", config.email)
            .parse()
            .map_err(|e| OutreachError::Config(format!("Invalid from: {e}")))?;

        let creds = Credentials::new(config.email.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| OutreachError::Config(format!("SMTP relay: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self { from, mailer })
    }

    /// Build the message for a contact. Bodies that look like HTML are sent as HTML.
    pub fn build_message(&self, contact: &Contact, email: &RenderedEmail) -> Result<Message> {
        let to_addr = if contact.name.trim().is_empty() {
            contact.email_address.clone()
        } else {
            format!("{} <{}>", contact.name.trim(), contact.email_address)
        };
        let to: Mailbox = to_addr
            .parse()
            .map_err(|e| OutreachError::validation(format!("Invalid to: {e}")))?;

        let content_type = if looks_like_html(&email.body) {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(content_type)
            .body(email.body.clone())
            .map_err(|e| OutreachError::validation(format!("Build email: {e}")))
    }
}

fn looks_like_html(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("<html") || lower.contains("<br")
}

#[async_trait]
impl OutreachClient for SmtpOutreachClient {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, contact: &Contact, email: &RenderedEmail) -> SendResult {
        let message = match self.build_message(contact, email) {
            Ok(message) => message,
            Err(e) => return SendResult::Error(e.to_string()),
        };
        match self.mailer.send(message).await {
            Ok(_) => {
                tracing::debug!("📤 SMTP accepted mail for {}", contact.email_address);
                SendResult::Ok
            }
            Err(e) => SendResult::Error(format!("SMTP send: {e}")),
        }
    }
}
