use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail relay rejected the message: {0}")]
    Rejected(String),

    #[error("Mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail delivery disabled")]
    Disabled,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Hands messages to an HTTP mail relay as JSON.
pub struct RelayMailer {
    client: reqwest::Client,
    url: String,
    from: String,
}

impl RelayMailer {
    pub fn new(url: impl Into<String>, from: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into(), from: from.into() }
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let message = RelayMessage { from: &self.from, to: &email.to, subject: &email.subject, text: &email.text };
        let response = self.client.post(&self.url).json(&message).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(format!("{} {}", status, body)));
        }
        tracing::info!(to = %email.to, subject = %email.subject, "mail relayed");
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, text = %email.text, "mail (not delivered)");
        Ok(())
    }
}

/// Keeps sent messages in memory. Can be told to fail.
#[derive(Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<Email>>,
    fail: AtomicBool,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    pub async fn last(&self) -> Option<Email> {
        self.sent.lock().await.last().cloned()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Disabled);
        }
        self.sent.lock().await.push(email);
        Ok(())
    }
}

/// Relay when one is configured, the log otherwise.
pub fn from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match &config.relay_url {
        Some(url) => Arc::new(RelayMailer::new(url.clone(), config.from.clone())),
        None => Arc::new(LogMailer),
    }
}
