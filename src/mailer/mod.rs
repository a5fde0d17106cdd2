/// Outbound email for verification and password reset codes
///
/// When no SMTP transport is configured the mailer degrades to a no-op
/// that logs a warning, so local development works without a relay.
use crate::config::EmailConfig;
use crate::error::{ApiError, ApiResult};
use lettre::{
    message::header::ContentType, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
}

impl Mailer {
    pub fn new(config: Option<&EmailConfig>) -> ApiResult<Self> {
        match config {
            Some(email) => {
                let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(&email.smtp_url)
                    .map_err(|e| ApiError::Mail(format!("Invalid SMTP URL: {}", e)))?
                    .build();

                Ok(Self {
                    transport: Some(transport),
                    from_address: email.from_address.clone(),
                })
            }
            None => {
                tracing::warn!("No SMTP transport configured, outbound email disabled");
                Ok(Self {
                    transport: None,
                    from_address: String::new(),
                })
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send the account verification code.
    pub async fn send_verification_code(&self, to: &str, code: &str) -> ApiResult<()> {
        let body = format!(
            "Welcome to MathsApp!\n\n\
             Your verification code is: {}\n\n\
             It expires in 10 minutes.",
            code
        );
        self.send(to, "MathsApp account verification", body).await
    }

    /// Send the password reset code.
    pub async fn send_reset_code(&self, to: &str, code: &str) -> ApiResult<()> {
        let body = format!(
            "A password reset was requested for your MathsApp account.\n\n\
             Your reset code is: {}\n\n\
             It expires in 10 minutes. If you did not request this, you can ignore this message.",
            code
        );
        self.send(to, "MathsApp password reset", body).await
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> ApiResult<()> {
        let Some(transport) = &self.transport else {
            tracing::warn!(to = %to, subject = %subject, "Email not sent: mailer disabled");
            return Ok(());
        };

        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| ApiError::Mail(format!("Invalid from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| ApiError::Mail(format!("Invalid recipient address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| ApiError::Mail(format!("Failed to build message: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| ApiError::Mail(format!("SMTP send failed: {}", e)))?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_mailer_is_noop() {
        let mailer = Mailer::new(None).unwrap();
        assert!(!mailer.is_enabled());
        mailer
            .send_verification_code("eleve@example.org", "AB12")
            .await
            .unwrap();
    }

    #[test]
    fn test_invalid_smtp_url_rejected() {
        let config = EmailConfig {
            smtp_url: "not a url".to_string(),
            from_address: "noreply@example.org".to_string(),
        };
        assert!(Mailer::new(Some(&config)).is_err());
    }
}
