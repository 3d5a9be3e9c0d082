//! Outbound mail.
//!
//! SMTP via lettre with handlebars templates. The transport is optional:
//! with email disabled in config every send becomes a logged no-op, which is
//! also what happens when a send fails. Mail is a side effect here, never
//! the reason a request errors.

mod templates;

pub use templates::{RenderedEmail, TemplateEngine};

use anyhow::{Context, Result};
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::{
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use abportal_utils::EmailConfig;

pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    templates: TemplateEngine,
    from_address: String,
    from_name: String,
}

impl Mailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let transport = if config.enabled {
            let creds = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );
            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .context("Failed to create SMTP transport")?
                .port(config.smtp_port)
                .credentials(creds)
                .build();
            Some(transport)
        } else {
            None
        };

        Ok(Self {
            transport,
            templates: TemplateEngine::new(),
            from_address: config.from_address.clone(),
            from_name: config.from_name.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Render and send a templated mail. Failures are logged, not returned.
    pub async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        template_id: &str,
        variables: serde_json::Value,
    ) {
        match self.try_send(to_email, to_name, template_id, &variables).await {
            Ok(true) => {
                tracing::info!("Sent {} mail to {}", template_id, to_email);
            }
            Ok(false) => {
                tracing::debug!("Email disabled, skipped {} mail to {}", template_id, to_email);
            }
            Err(e) => {
                tracing::error!("Failed to send {} mail to {}: {}", template_id, to_email, e);
            }
        }
    }

    async fn try_send(
        &self,
        to_email: &str,
        to_name: &str,
        template_id: &str,
        variables: &serde_json::Value,
    ) -> Result<bool> {
        let Some(transport) = &self.transport else {
            return Ok(false);
        };

        let rendered = self.templates.render(template_id, variables)?;

        let from_mailbox: Mailbox = format!("{} <{}>", self.from_name, self.from_address)
            .parse()
            .context("Invalid from address")?;
        let to_mailbox: Mailbox = format!("{} <{}>", to_name, to_email)
            .parse()
            .context("Invalid to address")?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(rendered.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(rendered.body_text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(rendered.body_html),
                    ),
            )
            .context("Failed to build email")?;

        transport.send(email).await.context("Failed to send email")?;
        Ok(true)
    }
}
