use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::errors::NotifyError;
use crate::reading::Alert;
use crate::secrets::SecretProvider;

/// The external one-shot notification contract. Implementations own the
/// transport; they never queue, retry, or dedupe.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Converts a detected anomaly into an outbound notification, with local
/// failure isolation: every attempt is logged, failures are swallowed here,
/// and the calling detector keeps processing.
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn dispatch(&self, alert: &Alert) {
        warn!(
            channel = %alert.channel,
            timestamp = %alert.timestamp,
            message = %alert.message,
            "Anomaly detected"
        );
        match self.notifier.send_alert(alert).await {
            Ok(()) => info!(
                channel = %alert.channel,
                timestamp = %alert.timestamp,
                "Alert dispatched"
            ),
            Err(e) => error!(
                channel = %alert.channel,
                timestamp = %alert.timestamp,
                error = %e,
                "Alert dispatch failed; alert dropped"
            ),
        }
    }
}

/// Log-only delivery, for runs without a configured gateway and for tests.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError> {
        info!(channel = %alert.channel, message = %alert.message, "ALERT (log only)");
        Ok(())
    }
}

/// Sends alert texts through an authenticated HTTP SMS gateway. Credentials
/// come from the injected [`SecretProvider`]; this type never touches files
/// or environment variables itself.
pub struct SmsGatewayNotifier {
    client: reqwest::Client,
    gateway_url: String,
    api_token: String,
    recipient: String,
}

impl SmsGatewayNotifier {
    pub fn from_secrets(secrets: &dyn SecretProvider) -> Result<Self, NotifyError> {
        Ok(Self {
            client: reqwest::Client::new(),
            gateway_url: secrets.get("sms_gateway_url")?,
            api_token: secrets.get("sms_gateway_token")?,
            recipient: secrets.get("sms_recipient")?,
        })
    }
}

#[async_trait]
impl Notifier for SmsGatewayNotifier {
    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "to": self.recipient,
            "text": alert.message,
            "channel": alert.channel.label(),
            "reading_timestamp": alert.timestamp,
            "raised_at": alert.raised_at.to_rfc3339(),
        });
        let response = self
            .client
            .post(&self.gateway_url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport {
                message: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(NotifyError::Auth)
            }
            status => Err(NotifyError::Transport {
                message: format!("gateway returned {status}"),
            }),
        }
    }
}
