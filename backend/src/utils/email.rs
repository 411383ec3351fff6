use anyhow::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;

/// Outgoing mail used by the account flows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a newly generated password to the account owner.
    async fn send_generated_password(
        &self,
        to_email: &str,
        username: &str,
        password: &str,
    ) -> Result<()>;
}

pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    skip_send: bool,
}

impl SmtpMailer {
    pub fn from_env() -> Result<Self> {
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "465".to_string())
            .parse::<u16>()
            .unwrap_or(465);
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let from_address = env::var("SMTP_FROM_ADDRESS")
            .unwrap_or_else(|_| "noreply@uxtracking.local".to_string());
        let skip_send = env::var("SMTP_SKIP_SEND").unwrap_or_default() == "true";

        let mailer = if smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp_host)
                .port(smtp_port)
                .build()
        } else {
            let creds = Credentials::new(smtp_username, smtp_password);
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_host)?
                .port(smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            mailer,
            from_address,
            skip_send,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_generated_password(
        &self,
        to_email: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        if self.skip_send {
            tracing::info!(to = %to_email, "SMTP_SKIP_SEND set; password reset mail not sent");
            return Ok(());
        }

        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to_email.parse()?)
            .subject("UX-Tracking password reset.")
            .header(ContentType::TEXT_PLAIN)
            .body(password_reset_body(username, password))?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

fn password_reset_body(username: &str, password: &str) -> String {
    format!(
        r#"
Hello {},

A new password was generated for your UX-Tracking account:

    {}

Sign in with it and change it from your account page.

If you did not ask for this, contact the administrators.

---
UX-Tracking
"#,
        username, password
    )
}
