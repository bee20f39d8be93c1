//! Follow-up engine: the periodic sweep that moves contacts from
//! `followup_due` to `followup_sent`, plus the background loop that runs it.
//!
//! A tick is a pure function of the store and the clock. It can run
//! concurrently with any other tick or user action; the email-record claim
//! decides who sends.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use outreach_core::config::FollowupRetry;
use outreach_core::error::{OutreachError, Result};
use outreach_core::types::{CampaignStatus, ContactState, EmailKind, TickReport};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::context::OutreachContext;
use crate::delivery::{Claim, Delivery, complete_if_settled, deliver};
use crate::notify::{StatusKind, StatusUpdate};

/// Runs follow-up sweeps against a shared context.
#[derive(Clone)]
pub struct FollowUpEngine {
    ctx: Arc<OutreachContext>,
}

impl FollowUpEngine {
    pub fn new(ctx: Arc<OutreachContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<OutreachContext> {
        &self.ctx
    }

    /// Sweep for due follow-ups now.
    pub async fn tick(&self) -> Result<TickReport> {
        self.tick_at(Utc::now()).await
    }

    /// Sweep for follow-ups due at `now`.
    ///
    /// Per-contact problems are logged and counted. Only a store failure
    /// returns `Err`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let settings = &self.ctx.settings;
        let due = self
            .ctx
            .db
            .due_followups(now, settings.followup_delay, settings.followup_retry)?;
        let mut report = TickReport {
            started_at: now,
            due: due.len(),
            sent: 0,
            failed: 0,
            conflicts: 0,
        };
        if due.is_empty() {
            tracing::debug!("⏰ Follow-up tick: nothing due");
            return Ok(report);
        }
        tracing::info!("⏰ Follow-up tick: {} contacts due", due.len());

        let mut touched = BTreeSet::new();
        for (i, item) in due.iter().enumerate() {
            if i > 0 && !settings.send_spacing.is_zero() {
                tokio::time::sleep(settings.send_spacing).await;
            }
            let campaign = self.ctx.db.get_campaign(item.campaign_id)?;
            let contact = self.ctx.db.get_contact(item.contact_id)?;
            let owner = match self.ctx.resolve_owner(&campaign.owner_user_id) {
                Ok(owner) => owner,
                Err(e) if e.is_per_contact() => {
                    tracing::warn!("⚠️ Skipping follow-up to {}: {e}", contact.email_address);
                    report.failed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let claim = if item.retry {
                Claim::Reclaim
            } else {
                Claim::Insert
            };
            match deliver(&self.ctx, &campaign, &contact, &owner, EmailKind::Followup, claim)
                .await?
            {
                Delivery::Sent { .. } => report.sent += 1,
                Delivery::Failed { .. } | Delivery::Invalid(_) => report.failed += 1,
                Delivery::Conflict => report.conflicts += 1,
            }
            touched.insert(campaign.id);
        }

        for campaign_id in touched {
            complete_if_settled(&self.ctx, campaign_id)?;
        }

        tracing::info!(
            "✅ Follow-up tick done: {} sent, {} failed, {} already claimed",
            report.sent,
            report.failed,
            report.conflicts
        );
        self.ctx.status.publish(StatusUpdate::new(
            StatusKind::TickCompleted,
            format!(
                "{} due, {} sent, {} failed",
                report.due, report.sent, report.failed
            ),
        ));
        Ok(report)
    }

    /// Send one contact's follow-up immediately, if it is due.
    ///
    /// Uses the same due predicate and claim as the tick, so racing a tick
    /// still yields a single record.
    pub async fn send_followup_now(&self, campaign_id: i64, contact_id: i64) -> Result<Delivery> {
        let campaign = self.ctx.db.get_campaign(campaign_id)?;
        let contact = self.ctx.db.get_contact(contact_id)?;
        if contact.campaign_id != campaign_id {
            return Err(OutreachError::NotFound(format!(
                "contact {contact_id} in campaign {campaign_id}"
            )));
        }
        if campaign.status != CampaignStatus::Active {
            return Err(OutreachError::validation(format!(
                "campaign {campaign_id} is {}",
                campaign.status
            )));
        }

        let initial = self.ctx.db.get_record(campaign_id, contact_id, EmailKind::Initial)?;
        let followup = self
            .ctx
            .db
            .get_record(campaign_id, contact_id, EmailKind::Followup)?;
        let state = ContactState::derive(
            initial.as_ref(),
            followup.as_ref(),
            Utc::now(),
            self.ctx.settings.followup_delay,
        );
        let claim = match (state, self.ctx.settings.followup_retry) {
            (ContactState::FollowupDue, _) => Claim::Insert,
            (ContactState::FollowupFailed, FollowupRetry::RetryUntilSent) => Claim::Reclaim,
            (ContactState::FollowupSent | ContactState::InFlight, _) => {
                return Ok(Delivery::Conflict);
            }
            (state, _) => {
                return Err(OutreachError::validation(format!(
                    "follow-up not due for contact {contact_id} ({state:?})"
                )));
            }
        };

        let owner = self.ctx.resolve_owner(&campaign.owner_user_id)?;
        let delivery =
            deliver(&self.ctx, &campaign, &contact, &owner, EmailKind::Followup, claim).await?;
        complete_if_settled(&self.ctx, campaign_id)?;
        Ok(delivery)
    }

    /// Start the background loop. The first sweep runs immediately.
    pub fn spawn(&self, state: Arc<SchedulerState>) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        state.running.store(true, Ordering::SeqCst);
        let join = tokio::spawn(scheduler_loop(self.clone(), cancel.clone(), state.clone()));
        SchedulerHandle {
            cancel,
            join,
            state,
        }
    }
}

/// Liveness and progress of the background loop, readable at any time.
#[derive(Debug, Default)]
pub struct SchedulerState {
    running: AtomicBool,
    ticks: AtomicU64,
    last_tick: Mutex<Option<TickReport>>,
    last_error: Mutex<Option<String>>,
}

impl SchedulerState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.is_running(),
            ticks: self.ticks.load(Ordering::SeqCst),
            last_tick: self.last_tick.lock().ok().and_then(|t| t.clone()),
            last_error: self.last_error.lock().ok().and_then(|e| e.clone()),
        }
    }

    fn record(&self, outcome: &Result<TickReport>) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        match outcome {
            Ok(report) => {
                if let Ok(mut last) = self.last_tick.lock() {
                    *last = Some(report.clone());
                }
                if let Ok(mut err) = self.last_error.lock() {
                    *err = None;
                }
            }
            Err(e) => {
                if let Ok(mut err) = self.last_error.lock() {
                    *err = Some(e.to_string());
                }
            }
        }
    }
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub ticks: u64,
    pub last_tick: Option<TickReport>,
    pub last_error: Option<String>,
}

/// Owned handle to a running scheduler loop.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
    state: Arc<SchedulerState>,
}

impl SchedulerHandle {
    /// False once the loop task has exited, including by panic.
    pub fn is_running(&self) -> bool {
        self.state.is_running() && !self.join.is_finished()
    }

    /// Signal shutdown and wait for the loop to exit.
    ///
    /// A tick in progress finishes its whole batch first.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            tracing::error!("❌ Scheduler loop panicked: {e}");
        }
        self.state.running.store(false, Ordering::SeqCst);
    }
}

/// Clears the liveness flag however the loop task ends.
struct RunningGuard(Arc<SchedulerState>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
    }
}

async fn scheduler_loop(
    engine: FollowUpEngine,
    cancel: CancellationToken,
    state: Arc<SchedulerState>,
) {
    let running = RunningGuard(state.clone());
    let ctx = engine.context().clone();
    let settings = &ctx.settings;
    tracing::info!(
        "⏰ Follow-up scheduler started (check every {}s, delay {}s)",
        settings.poll_interval.as_secs(),
        settings.followup_delay.num_seconds()
    );
    ctx.status.publish(StatusUpdate::new(
        StatusKind::SchedulerStarted,
        "follow-up scheduler started",
    ));

    // Rows left pending by a sender that died between claim and finalise.
    let stale_after = chrono::Duration::from_std(settings.send_timeout.saturating_mul(2))
        .unwrap_or_else(|_| chrono::Duration::minutes(1));
    let stale_before = Utc::now()
        .checked_sub_signed(stale_after)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    match ctx.db.fail_stale_pending(stale_before) {
        Ok(0) => {}
        Ok(n) => tracing::warn!("⚠️ Marked {n} interrupted sends as failed"),
        Err(e) => tracing::error!("❌ Could not recover pending sends: {e}"),
    }

    let mut ticker = tokio::time::interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Not raced against cancellation: a started batch always completes.
        let outcome = engine.tick().await;
        if let Err(e) = &outcome {
            tracing::error!("❌ Follow-up tick failed: {e}");
            ctx.status.publish(StatusUpdate::new(StatusKind::TickFailed, e.to_string()));
        }
        state.record(&outcome);
    }

    drop(running);
    tracing::info!("⏹️ Follow-up scheduler stopped");
    ctx.status.publish(StatusUpdate::new(
        StatusKind::SchedulerStopped,
        "follow-up scheduler stopped",
    ));
}
