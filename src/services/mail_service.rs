//! Outbound mail.
//!
//! The password-reset flow only needs plain-text delivery, so the trait takes a
//! fully rendered [`OutgoingMail`]. Production uses SMTP through `lettre`;
//! tests plug in a recorder.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};

use crate::{
    config::MailConfig,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()>;
}

pub fn password_reset_mail(to: &str, otp: &str, valid_minutes: i64) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Password Reset OTP".to_string(),
        body: format!(
            "Your OTP for resetting password is: {otp}. It is valid for {valid_minutes} minutes."
        ),
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| AppError::Mail(format!("Failed to configure SMTP relay: {e}")))?
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.username.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::Mail(format!("Invalid from address: {e}")))?,
            )
            .to(mail
                .to
                .parse()
                .map_err(|e| AppError::BadRequest(format!("Invalid recipient email: {e}")))?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| AppError::Mail(format!("Failed to build email message: {e}")))?;

        match self.transport.send(message).await {
            Ok(_) => {
                tracing::info!(to = %mail.to, "mail sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to = %mail.to, error = %e, "mail delivery failed");
                Err(AppError::Mail(e.to_string()))
            }
        }
    }
}

/// Used when no SMTP account is configured.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()> {
        tracing::warn!(to = %mail.to, subject = %mail.subject, "mail is not configured; dropping message");
        Err(AppError::Mail("mail is not configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_mail_mentions_code_and_validity() {
        let mail = password_reset_mail("a@b.co", "123456", 10);
        assert_eq!(mail.to, "a@b.co");
        assert!(mail.body.contains("123456"));
        assert!(mail.body.contains("10 minutes"));
    }

    #[tokio::test]
    async fn disabled_mailer_reports_an_error() {
        let err = DisabledMailer
            .send(password_reset_mail("a@b.co", "1", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Mail(_)));
    }
}
