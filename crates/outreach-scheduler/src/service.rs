//! Outreach service: the control surface callers drive.

use std::sync::Arc;

use chrono::Utc;
use outreach_core::config::OutreachConfig;
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{OutreachClient, PeopleFinder, RenderContext, TemplateRenderer};
use outreach_core::types::{
    BatchSummary, Campaign, CampaignStats, CampaignStatus, Contact, ContactState, EmailKind,
    EmailRecord, OwnerProfile, RenderedEmail, TickReport,
};
use tokio::sync::{Mutex, broadcast};

use crate::campaign;
use crate::context::OutreachContext;
use crate::delivery::Delivery;
use crate::engine::{FollowUpEngine, SchedulerHandle, SchedulerState, SchedulerStatus};
use crate::notify::StatusUpdate;
use crate::persistence::OutreachDb;

/// Owns the shared context and at most one running scheduler.
pub struct OutreachService {
    ctx: Arc<OutreachContext>,
    engine: FollowUpEngine,
    scheduler: Mutex<Option<SchedulerHandle>>,
    state: Arc<SchedulerState>,
}

impl OutreachService {
    pub fn new(
        config: &OutreachConfig,
        db: Arc<OutreachDb>,
        client: Arc<dyn OutreachClient>,
        finder: Arc<dyn PeopleFinder>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self::from_context(Arc::new(OutreachContext::new(
            config, db, client, finder, renderer,
        )))
    }

    pub fn from_context(ctx: Arc<OutreachContext>) -> Self {
        Self {
            engine: FollowUpEngine::new(ctx.clone()),
            ctx,
            scheduler: Mutex::new(None),
            state: Arc::new(SchedulerState::default()),
        }
    }

    pub fn context(&self) -> &Arc<OutreachContext> {
        &self.ctx
    }

    // ─── Campaigns ────────────────────────────────────────────

    pub async fn create_campaign(
        &self,
        owner_user_id: &str,
        company: &str,
        job_title: &str,
        job_description: Option<&str>,
    ) -> Result<Campaign> {
        campaign::create_campaign(&self.ctx, owner_user_id, company, job_title, job_description)
            .await
    }

    pub async fn send_initial_batch(&self, campaign_id: i64) -> Result<BatchSummary> {
        campaign::send_initial_batch(&self.ctx, campaign_id).await
    }

    pub fn campaign(&self, campaign_id: i64) -> Result<Campaign> {
        self.ctx.db.get_campaign(campaign_id)
    }

    pub fn list_campaigns(&self, owner_user_id: Option<&str>) -> Result<Vec<Campaign>> {
        self.ctx.db.list_campaigns(owner_user_id)
    }

    /// Owner-driven status change. Reactivating an archived campaign is allowed.
    pub fn set_campaign_status(&self, campaign_id: i64, status: CampaignStatus) -> Result<()> {
        self.ctx.db.set_campaign_status(campaign_id, status)?;
        tracing::info!("🗂️ Campaign {} set to {}", campaign_id, status);
        Ok(())
    }

    pub fn contacts(&self, campaign_id: i64) -> Result<Vec<Contact>> {
        self.ctx.db.list_contacts(campaign_id)
    }

    pub fn list_email_history(&self, campaign_id: i64) -> Result<Vec<EmailRecord>> {
        self.ctx.db.get_campaign(campaign_id)?;
        self.ctx.db.list_email_history(campaign_id)
    }

    pub fn campaign_stats(&self, campaign_id: i64) -> Result<CampaignStats> {
        self.ctx.db.get_campaign(campaign_id)?;
        self.ctx.db.campaign_stats(campaign_id)
    }

    /// Each contact with its derived lifecycle state at this moment.
    pub fn contact_states(&self, campaign_id: i64) -> Result<Vec<(Contact, ContactState)>> {
        let now = Utc::now();
        let delay = self.ctx.settings.followup_delay;
        Ok(self
            .ctx
            .db
            .contact_records(campaign_id)?
            .into_iter()
            .map(|r| {
                let state =
                    ContactState::derive(r.initial.as_ref(), r.followup.as_ref(), now, delay);
                (r.contact, state)
            })
            .collect())
    }

    /// Render an email without sending or recording anything.
    pub fn preview_email(
        &self,
        campaign_id: i64,
        contact_id: i64,
        kind: EmailKind,
    ) -> Result<RenderedEmail> {
        let campaign = self.ctx.db.get_campaign(campaign_id)?;
        let contact = self.ctx.db.get_contact(contact_id)?;
        if contact.campaign_id != campaign_id {
            return Err(OutreachError::NotFound(format!(
                "contact {contact_id} in campaign {campaign_id}"
            )));
        }
        let owner = self.ctx.resolve_owner(&campaign.owner_user_id)?;
        self.ctx.renderer.render(
            kind,
            RenderContext {
                contact: &contact,
                campaign: &campaign,
                owner: &owner,
            },
        )
    }

    pub async fn send_followup_now(&self, campaign_id: i64, contact_id: i64) -> Result<Delivery> {
        self.engine.send_followup_now(campaign_id, contact_id).await
    }

    // ─── Owner profiles ───────────────────────────────────────

    pub fn upsert_owner_profile(&self, profile: &OwnerProfile) -> Result<()> {
        if profile.owner_user_id.trim().is_empty() {
            return Err(OutreachError::validation("owner_user_id is required"));
        }
        self.ctx.db.upsert_owner_profile(profile)
    }

    pub fn owner_profile(&self, owner_user_id: &str) -> Result<OwnerProfile> {
        self.ctx.resolve_owner(owner_user_id)
    }

    // ─── Scheduler ────────────────────────────────────────────

    /// Start the follow-up scheduler. Returns false if it was already running.
    pub async fn start_scheduler(&self) -> bool {
        let mut slot = self.scheduler.lock().await;
        if slot.as_ref().is_some_and(SchedulerHandle::is_running) {
            tracing::debug!("⏰ Scheduler already running");
            return false;
        }
        if let Some(finished) = slot.take() {
            finished.stop().await;
        }
        *slot = Some(self.engine.spawn(self.state.clone()));
        true
    }

    /// Stop the scheduler, letting an in-flight tick finish. Returns false if
    /// it was not running.
    pub async fn stop_scheduler(&self) -> bool {
        let mut slot = self.scheduler.lock().await;
        match slot.take() {
            Some(handle) => {
                handle.stop().await;
                true
            }
            None => false,
        }
    }

    pub fn is_scheduler_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn scheduler_status(&self) -> SchedulerStatus {
        self.state.snapshot()
    }

    /// Run one sweep outside the background loop.
    pub async fn tick_now(&self) -> Result<TickReport> {
        self.engine.tick().await
    }

    // ─── Status updates ───────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.ctx.status.subscribe()
    }

    pub fn status_history(&self) -> Vec<StatusUpdate> {
        self.ctx.status.history()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::notify::StatusKind;
    use crate::testing::{FakeClient, context, people, test_config};

    fn service(n: usize) -> (OutreachService, Arc<FakeClient>) {
        let client = Arc::new(FakeClient::default());
        let ctx = context(&test_config(), client.clone(), people(n));
        (OutreachService::from_context(ctx), client)
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let (svc, _) = service(1);
        assert!(!svc.is_scheduler_running());
        assert!(!svc.stop_scheduler().await);

        assert!(svc.start_scheduler().await);
        assert!(!svc.start_scheduler().await);
        assert!(svc.is_scheduler_running());
        assert!(svc.scheduler_status().running);

        assert!(svc.stop_scheduler().await);
        assert!(!svc.stop_scheduler().await);
        assert!(!svc.is_scheduler_running());

        // Restart after a stop.
        assert!(svc.start_scheduler().await);
        assert!(svc.stop_scheduler().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_start_replaces_dead_scheduler() {
        let client = Arc::new(FakeClient::default());
        let mut config = test_config();
        config.followup_delay_secs = 0;
        let svc = OutreachService::from_context(context(&config, client.clone(), people(1)));
        let campaign = svc.create_campaign("me", "Acme", "Engineer", None).await.unwrap();
        svc.send_initial_batch(campaign.id).await.unwrap();

        client.panic_on_send.store(true, Ordering::SeqCst);
        assert!(svc.start_scheduler().await);
        for _ in 0..100 {
            if !svc.is_scheduler_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!svc.is_scheduler_running());
        assert!(!svc.scheduler_status().running);

        client.panic_on_send.store(false, Ordering::SeqCst);
        assert!(svc.start_scheduler().await);
        assert!(svc.is_scheduler_running());
        assert!(svc.stop_scheduler().await);
    }

    #[tokio::test]
    async fn test_end_to_end_campaign_flow() {
        let (svc, client) = service(3);
        let mut updates = svc.subscribe();

        let campaign = svc
            .create_campaign("me", "Acme", "Engineer", None)
            .await
            .unwrap();
        let summary = svc.send_initial_batch(campaign.id).await.unwrap();
        assert_eq!(summary.sent, 3);

        let states = svc.contact_states(campaign.id).unwrap();
        assert!(states.iter().all(|(_, s)| *s == ContactState::InitialSent));

        let history = svc.list_email_history(campaign.id).unwrap();
        assert_eq!(history.len(), 3);
        let stats = svc.campaign_stats(campaign.id).unwrap();
        assert_eq!(stats.initial_sent, 3);
        assert_eq!(stats.followups_sent, 0);
        assert_eq!(client.sent_count(), 3);

        let first = tokio::time::timeout(Duration::from_secs(1), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.kind, StatusKind::CampaignCreated);
        assert!(svc
            .status_history()
            .iter()
            .any(|u| u.kind == StatusKind::EmailSent));
    }

    #[tokio::test]
    async fn test_preview_does_not_send() {
        let (svc, client) = service(1);
        let campaign = svc
            .create_campaign("me", "Acme", "Engineer", None)
            .await
            .unwrap();
        let contact = &svc.contacts(campaign.id).unwrap()[0];
        let preview = svc
            .preview_email(campaign.id, contact.id, EmailKind::Followup)
            .unwrap();
        assert_eq!(preview.subject, "followup for Person");
        assert_eq!(client.sent_count(), 0);
        assert!(svc.list_email_history(campaign.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_profile_overrides_config() {
        let (svc, _) = service(1);
        svc.upsert_owner_profile(&OwnerProfile {
            owner_user_id: "me".into(),
            name: "Stored Name".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(svc.owner_profile("me").unwrap().name, "Stored Name");
        // Unknown owners do not inherit a profile configured for someone else.
        assert!(svc.owner_profile("someone-else").is_err());
        assert!(svc.upsert_owner_profile(&OwnerProfile::default()).is_err());
    }

    #[tokio::test]
    async fn test_history_for_unknown_campaign() {
        let (svc, _) = service(1);
        assert!(matches!(
            svc.list_email_history(42),
            Err(OutreachError::NotFound(_))
        ));
    }
}
