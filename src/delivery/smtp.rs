//! SMTP code sender using lettre.

use crate::attempt::SignInAttempt;
use crate::delivery::CodeSender;
use crate::error::{DeadboltError, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// SMTP sender configuration.
#[derive(Debug, Clone)]
pub struct SmtpSenderConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port (default: 587 for STARTTLS).
    pub port: u16,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// "From" address on outgoing mail.
    pub from: String,
    /// Subject line (default: "Your verification code").
    pub subject: String,
    /// Use STARTTLS (default: true).
    pub starttls: bool,
}

impl SmtpSenderConfig {
    /// Create a configuration with the server hostname and "from" address.
    pub fn new(host: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            username: None,
            password: None,
            from: from.into(),
            subject: "Your verification code".to_string(),
            starttls: true,
        }
    }

    /// Set the port (default: 587).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set authentication credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the subject line.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Disable STARTTLS (use a plain connection).
    pub fn no_starttls(mut self) -> Self {
        self.starttls = false;
        self
    }

    /// Create a configuration from environment variables.
    ///
    /// Reads `SMTP_HOST` and `SMTP_FROM` (required), plus `SMTP_PORT`,
    /// `SMTP_USERNAME`, `SMTP_PASSWORD`, and `SMTP_STARTTLS` (optional).
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST")
            .map_err(|_| DeadboltError::internal("SMTP_HOST environment variable not set"))?;
        let from = std::env::var("SMTP_FROM")
            .map_err(|_| DeadboltError::internal("SMTP_FROM environment variable not set"))?;

        let mut config = Self::new(host, from);

        if let Some(port) = std::env::var("SMTP_PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        config.username = std::env::var("SMTP_USERNAME").ok();
        config.password = std::env::var("SMTP_PASSWORD").ok();
        config.starttls = std::env::var("SMTP_STARTTLS")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(config)
    }
}

/// Delivers codes by email over SMTP.
pub struct SmtpCodeSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpSenderConfig,
}

impl SmtpCodeSender {
    /// Create a sender with the given configuration.
    pub fn new(config: SmtpSenderConfig) -> Result<Self> {
        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(|e| {
                DeadboltError::internal(format!("failed to create SMTP transport: {}", e))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }

    /// Create a sender from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(SmtpSenderConfig::from_env()?)
    }

    fn build_message(&self, destination: &str, code: &str) -> Result<Message> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|e| DeadboltError::internal(format!("invalid 'from' address: {}", e)))?;

        let to: Mailbox = destination.parse().map_err(|e| {
            DeadboltError::delivery_failed(format!("invalid destination address: {}", e))
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&self.config.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "Your verification code is {}.\n\nIt expires shortly; if you did not request it, ignore this message.",
                code
            ))
            .map_err(|e| DeadboltError::internal(format!("failed to build email: {}", e)))
    }
}

#[async_trait]
impl CodeSender for SmtpCodeSender {
    async fn send_code(&self, destination: &str, attempt: &SignInAttempt) -> Result<()> {
        let code = attempt
            .delivered_code()
            .ok_or_else(|| DeadboltError::internal("attempt has no delivered code to send"))?;

        let message = self.build_message(destination, code)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DeadboltError::delivery_failed(format!("SMTP send failed: {}", e)))?;

        Ok(())
    }
}

impl std::fmt::Debug for SmtpCodeSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCodeSender")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .finish()
    }
}
