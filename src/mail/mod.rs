//! Outbound mail
//!
//! Account credentials are delivered by email through an authenticated SMTP
//! relay. When mail is disabled the message is logged and dropped.

use crate::core::config::MailConfig;
use crate::core::error::{RegistryError, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};

/// Sends one plaintext message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// SMTP relay client over implicit TLS
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let from: Mailbox = config.from_address.parse()?;
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = SmtpTransport::relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        info!(
            smtp_host = %config.smtp_host,
            smtp_port = config.smtp_port,
            from = %config.from_address,
            "SMTP mailer initialized"
        );

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let recipient: Mailbox = to.parse().map_err(|e| {
            RegistryError::ValidationError(format!("Invalid recipient address {}: {}", to, e))
        })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| RegistryError::DependencyError(format!("Failed to build email: {}", e)))?;

        let transport = self.transport.clone();
        let sent = tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| RegistryError::TaskError(format!("Mail task panicked: {}", e)))?;

        match sent {
            Ok(_) => {
                info!(to = %to, "Email sent");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, to = %to, "Failed to send email via SMTP");
                Err(RegistryError::DependencyError(format!("SMTP error: {}", e)))
            }
        }
    }
}

/// Used when mail is disabled: logs the send and skips delivery
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        info!(to = %to, subject = %subject, "Mail disabled, skipping send");
        Ok(())
    }
}

/// Pick the mailer for the configured mode
pub fn build_mailer(config: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    if config.enabled {
        Ok(Arc::new(SmtpMailer::new(config)?))
    } else {
        info!("Mail delivery disabled");
        Ok(Arc::new(LogMailer))
    }
}

/// Subject and body of the message carrying a generated password
pub fn credentials_message(display_name: &str, username: &str, password: &str) -> (String, String) {
    let subject = "Your school account".to_string();
    let body = format!(
        "Hello {},\n\n\
         An account has been created for you.\n\n\
         Username: {}\n\
         Password: {}\n\n\
         Please log in and change your password.\n",
        display_name, username, password
    );
    (subject, body)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every message instead of sending it
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    /// Always fails as an unreachable relay would
    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<()> {
            Err(RegistryError::DependencyError("connection refused".to_string()))
        }
    }
}
