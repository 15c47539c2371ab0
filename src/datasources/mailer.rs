use super::{MailSender, OutgoingMail};
use crate::config::MailConfig;
use crate::error::{AgroError, Result};
use async_trait::async_trait;
use serde::Serialize;

/// Delivers mail through an HTTP relay that accepts a JSON message.
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client, config })
    }

    fn message<'a>(&'a self, mail: &'a OutgoingMail) -> RelayMessage<'a> {
        RelayMessage {
            from: &self.config.from,
            to: vec![mail.to.as_str()],
            subject: &mail.subject,
            text: &mail.body,
        }
    }
}

#[async_trait]
impl MailSender for HttpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        if mail.to.trim().is_empty() {
            return Err(AgroError::InvalidData("mail has no recipient".into()));
        }

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&self.message(mail))
            .send()
            .await
            .map_err(|e| AgroError::DataSourceUnavailable(format!("Mail relay: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgroError::DataSourceUnavailable(format!(
                "Mail relay returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
