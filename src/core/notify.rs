// src/core/notify.rs

//! Produces start/stop/daily/change notifications. Grounded in the Brevo
//! transactional email API used by the system this orchestrator replaces
//! for node-status email alerts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

use crate::core::errors::{OrchestratorError, Result};
use crate::core::node::Status;
use crate::core::topology::ChangeSet;

pub const SUBJECT_START: &str = "Orchestrator Script Started";
pub const SUBJECT_START_DANGEROUS: &str = "WARNING: Orchestrator Script Started Dangerously";
pub const SUBJECT_DAILY: &str = "Orchestrator Daily Report";
pub const SUBJECT_CHANGE: &str = "ALERT: MySQL Topology Change Detected";
pub const SUBJECT_STOP: &str = "Orchestrator Script Stopped Safely";

/// An opaque `send(subject, html)` interface. The stdout fallback
/// is a concrete implementation, not a branch inside a single notifier.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()>;
}

impl dyn Notify {
    pub async fn start(&self, dangerous: bool, at: DateTime<Utc>) -> Result<()> {
        let subject = if dangerous {
            SUBJECT_START_DANGEROUS
        } else {
            SUBJECT_START
        };
        let body = format!(
            "<p>Started at {}</p><p>Dangerous start: {}</p>",
            at.to_rfc3339(),
            dangerous
        );
        self.send(subject, &body).await
    }

    pub async fn daily(&self, primary: Option<&str>, rows: &[(String, Status, Option<u64>)]) -> Result<()> {
        let mut body = format!("<p>Primary: {}</p><table>", primary.unwrap_or("none"));
        for (host, status, lag) in rows {
            let lag_str = lag.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
            body.push_str(&format!(
                "<tr><td>{host}</td><td>{status}</td><td>{lag_str}</td></tr>"
            ));
        }
        body.push_str("</table>");
        self.send(SUBJECT_DAILY, &body).await
    }

    pub async fn stop(&self, at: DateTime<Utc>) -> Result<()> {
        let body = format!("<p>Stopped at {}</p>", at.to_rfc3339());
        self.send(SUBJECT_STOP, &body).await
    }

    pub async fn change(&self, old_primary: Option<&str>, new_primary: Option<&str>, changes: &ChangeSet) -> Result<()> {
        let mut body = format!(
            "<p>Primary: {} -&gt; {}</p><ul>",
            old_primary.unwrap_or("none"),
            new_primary.unwrap_or("none")
        );
        for (host, old, new) in &changes.status_changes {
            let old_str = old.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string());
            body.push_str(&format!("<li>{host}: {old_str} -&gt; {new}</li>"));
        }
        body.push_str("</ul>");
        self.send(SUBJECT_CHANGE, &body).await
    }
}

#[derive(Serialize)]
struct BrevoSendRequest<'a> {
    sender: BrevoSender<'a>,
    to: Vec<BrevoRecipient<'a>>,
    subject: &'a str,
    #[serde(rename = "htmlContent")]
    html_content: &'a str,
}

#[derive(Serialize)]
struct BrevoSender<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct BrevoRecipient<'a> {
    email: &'a str,
}

/// Sends mail through Brevo's transactional email HTTP API, using
/// `BREVO_API_KEY` / `SENDER_EMAIL` from the environment.
pub struct BrevoNotifier {
    client: reqwest::Client,
    api_key: String,
    sender_email: String,
    notify_to: String,
}

impl BrevoNotifier {
    const ENDPOINT: &'static str = "https://api.brevo.com/v3/smtp/email";

    pub fn new(api_key: String, sender_email: String, notify_to: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            sender_email,
            notify_to,
        }
    }

    /// Returns a working notifier if both required env vars are present,
    /// falling back to stdout otherwise: their absence downgrades
    /// notifications to stdout.
    pub fn from_env_or_stdout(notify_to: String) -> Box<dyn Notify> {
        match (std::env::var("BREVO_API_KEY"), std::env::var("SENDER_EMAIL")) {
            (Ok(api_key), Ok(sender_email)) => {
                Box::new(BrevoNotifier::new(api_key, sender_email, notify_to))
            }
            _ => {
                warn!("BREVO_API_KEY or SENDER_EMAIL not set; notifications will go to stdout");
                Box::new(StdoutNotifier)
            }
        }
    }
}

#[async_trait]
impl Notify for BrevoNotifier {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        let request = BrevoSendRequest {
            sender: BrevoSender {
                email: &self.sender_email,
            },
            to: vec![BrevoRecipient {
                email: &self.notify_to,
            }],
            subject,
            html_content: html_body,
        };

        let response = self
            .client
            .post(Self::ENDPOINT)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Brevo send failed ({}): {}", status, text);
            return Err(OrchestratorError::Notify(format!(
                "Brevo responded {status}: {text}"
            )));
        }
        Ok(())
    }
}

/// Writes notifications to stdout with sentinel markers when no email
/// transport is configured. This is a correctness requirement, not a
/// degraded no-op: silent drop is not acceptable.
pub struct StdoutNotifier;

#[async_trait]
impl Notify for StdoutNotifier {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        println!("=== NOTIFICATION START ===");
        println!("Subject: {subject}");
        println!("{html_body}");
        println!("=== NOTIFICATION END ===");
        Ok(())
    }
}
