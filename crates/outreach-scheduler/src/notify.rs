//! Status updates: what the core tells the outside world about sends, ticks
//! and scheduler lifecycle.
//! Subscribers get a live broadcast; late joiners can read the recent history.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const HISTORY_LIMIT: usize = 100;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    CampaignCreated,
    EmailSent,
    EmailFailed,
    /// Another actor had already claimed the email.
    EmailSkipped,
    CampaignCompleted,
    TickCompleted,
    TickFailed,
    SchedulerStarted,
    SchedulerStopped,
}

/// A status update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub kind: StatusKind,
    pub campaign_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl StatusUpdate {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            campaign_id: None,
            contact_id: None,
            message: message.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn campaign(mut self, campaign_id: i64) -> Self {
        self.campaign_id = Some(campaign_id);
        self
    }

    pub fn contact(mut self, contact_id: i64) -> Self {
        self.contact_id = Some(contact_id);
        self
    }
}

/// Status router: broadcast to live subscribers plus an in-memory ring
/// buffer of the last 100 updates.
#[derive(Clone)]
pub struct StatusRouter {
    tx: broadcast::Sender<StatusUpdate>,
    history: Arc<Mutex<VecDeque<StatusUpdate>>>,
}

impl StatusRouter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HISTORY_LIMIT);
        Self {
            tx,
            history: Arc::new(Mutex::new(VecDeque::with_capacity(HISTORY_LIMIT))),
        }
    }

    /// Record and broadcast an update. Having no subscribers is fine.
    pub fn publish(&self, update: StatusUpdate) {
        tracing::debug!("📣 [{:?}] {}", update.kind, update.message);
        if let Ok(mut history) = self.history.lock() {
            history.push_back(update.clone());
            if history.len() > HISTORY_LIMIT {
                history.pop_front();
            }
        }
        let _ = self.tx.send(update);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.tx.subscribe()
    }

    /// Recent updates, oldest first.
    pub fn history(&self) -> Vec<StatusUpdate> {
        self.history
            .lock()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for StatusRouter {
    fn default() -> Self {
        Self::new()
    }
}
