//! Notification gateway.
//!
//! The account flows only construct message parameters and hand them to a
//! [`Mailer`]; delivery is best-effort and callers never fail their primary
//! state transition on a send error. `SendgridMailer` talks to the SendGrid
//! v3 HTTP API; `LogMailer` is the local-dev sender that just logs.

use anyhow::Context;
use axum::async_trait;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

pub struct SendgridMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendgridMailer {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for SendgridMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.body }],
        });

        let resp = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("sendgrid mail/send request")?;

        if !resp.status().is_success() {
            anyhow::bail!("sendgrid mail/send returned {}", resp.status());
        }
        debug!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}

/// Local-dev sender that logs the message instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "email send stub"
        );
        Ok(())
    }
}

pub fn activation_email(
    frontend_base_url: &str,
    to: &str,
    name: &str,
    token: &str,
) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Activate your account".to_string(),
        body: format!(
            "Hi {name},\n\nWelcome to Taskhub! Please confirm your email address \
             to activate your account:\n\n{frontend_base_url}/users/activate?token={token}\n"
        ),
    }
}

pub fn reset_password_email(
    frontend_base_url: &str,
    to: &str,
    name: &str,
    token: &str,
) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        body: format!(
            "Hi {name},\n\nA password reset was requested for your account. \
             Choose a new password here:\n\n\
             {frontend_base_url}/users/resetPassword?token={token}\n\n\
             If you did not request this, you can ignore this email.\n"
        ),
    }
}

pub fn cancellation_email(to: &str, name: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Sorry to see you go".to_string(),
        body: format!(
            "Goodbye {name},\n\nYour account has been deleted. We'd love to hear \
             what we could have done better.\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_email_embeds_link_and_token() {
        let msg = activation_email("https://app.example.com", "a@x.com", "A", "tok123");
        assert_eq!(msg.to, "a@x.com");
        assert!(msg
            .body
            .contains("https://app.example.com/users/activate?token=tok123"));
    }

    #[test]
    fn reset_email_embeds_link_and_token() {
        let msg = reset_password_email("https://app.example.com", "a@x.com", "A", "tok456");
        assert!(msg
            .body
            .contains("https://app.example.com/users/resetPassword?token=tok456"));
    }

    #[test]
    fn cancellation_email_addresses_user_by_name() {
        let msg = cancellation_email("a@x.com", "Ada");
        assert!(msg.body.contains("Ada"));
        assert_eq!(msg.subject, "Sorry to see you go");
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let msg = cancellation_email("a@x.com", "Ada");
        LogMailer.send(&msg).await.expect("log mailer send");
    }
}
