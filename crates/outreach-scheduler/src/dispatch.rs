//! Status dispatch: forwards status updates to an HTTP webhook as JSON.

use outreach_core::error::{OutreachError, Result};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::notify::{StatusRouter, StatusUpdate};

/// JSON body POSTed for one update.
pub fn webhook_payload(update: &StatusUpdate) -> serde_json::Value {
    serde_json::json!({
        "kind": update.kind,
        "campaign_id": update.campaign_id,
        "contact_id": update.contact_id,
        "message": update.message,
        "timestamp": update.timestamp.to_rfc3339(),
    })
}

/// Send one update to a webhook.
pub async fn send_webhook(
    client: &reqwest::Client,
    url: &str,
    update: &StatusUpdate,
) -> Result<()> {
    let resp = client
        .post(url)
        .json(&webhook_payload(update))
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| OutreachError::transport(format!("Webhook send failed: {e}")))?;

    if resp.status().is_success() {
        tracing::debug!("✅ Webhook update sent to {}: {:?}", url, update.kind);
        Ok(())
    } else {
        Err(OutreachError::transport(format!(
            "Webhook error {}",
            resp.status()
        )))
    }
}

/// Forward every update published on `router` to `url` until the router is dropped.
///
/// Delivery failures are logged and never block the publisher.
pub fn spawn_webhook_forwarder(router: &StatusRouter, url: String) -> JoinHandle<()> {
    let rx = router.subscribe();
    tokio::spawn(forward(rx, url))
}

async fn forward(mut rx: broadcast::Receiver<StatusUpdate>, url: String) {
    tracing::info!("🌐 Status webhook forwarder started: {url}");
    let client = reqwest::Client::new();
    loop {
        match rx.recv().await {
            Ok(update) => {
                if let Err(e) = send_webhook(&client, &url, &update).await {
                    tracing::warn!("⚠️ Status webhook failed: {e}");
                }
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!("⚠️ Status webhook lagging, dropped {missed} updates");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::info!("🌐 Status webhook forwarder stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::StatusKind;

    #[test]
    fn test_webhook_payload_shape() {
        let update = StatusUpdate::new(StatusKind::EmailSent, "follow-up sent")
            .campaign(1)
            .contact(2);
        let payload = webhook_payload(&update);
        assert_eq!(payload["kind"], "email_sent");
        assert_eq!(payload["campaign_id"], 1);
        assert_eq!(payload["contact_id"], 2);
        assert_eq!(payload["message"], "follow-up sent");
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_transport_error() {
        let client = reqwest::Client::new();
        let update = StatusUpdate::new(StatusKind::TickCompleted, "tick");
        let err = send_webhook(&client, "http://127.0.0.1:9/hook", &update)
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::Transport(_)));
    }

    #[tokio::test]
    async fn test_forwarder_exits_when_router_dropped() {
        let router = StatusRouter::new();
        let handle = spawn_webhook_forwarder(&router, "http://127.0.0.1:9/hook".into());
        drop(router);
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
