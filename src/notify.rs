//! Outbound notifications.
//!
//! Delivery (email, SMS, chat) is another system's job; this crate posts a
//! structured message to a webhook endpoint and moves on. `NoopNotifier`
//! keeps deployments without an endpoint and tests quiet.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),

    #[error("notification endpoint returned status {status}")]
    Endpoint { status: u16 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    CertificateIssued {
        certificate_id: i64,
        recipient: String,
        public_url: String,
        po_reference: String,
    },
    FieldReportReady {
        report_id: i64,
        recipient: String,
        share_url: String,
        po_reference: String,
    },
    InspectionDueReminder {
        client_id: i64,
        recipient: String,
        equipment_tags: Vec<String>,
        due_date: NaiveDate,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Posts each notification as JSON to a single webhook endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Endpoint {
                status: response.status().as_u16(),
            });
        }

        tracing::info!(endpoint = %self.endpoint, "Notification delivered");
        Ok(())
    }
}

/// Logs notifications instead of delivering them.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(?notification, "Notification dropped (no endpoint configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_payload_carries_kind_tag() {
        let notification = Notification::CertificateIssued {
            certificate_id: 9,
            recipient: "ops@acme.test".to_string(),
            public_url: "https://example.test/certificates/public/abc".to_string(),
            po_reference: "PO-889".to_string(),
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["kind"], "CERTIFICATE_ISSUED");
        assert_eq!(json["certificate_id"], 9);
    }

    #[tokio::test]
    async fn test_noop_notifier_accepts_everything() {
        let notifier = NoopNotifier;
        let notification = Notification::InspectionDueReminder {
            client_id: 1,
            recipient: "ops@acme.test".to_string(),
            equipment_tags: vec!["EQ-0001".to_string()],
            due_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        };
        assert!(notifier.notify(&notification).await.is_ok());
    }
}
