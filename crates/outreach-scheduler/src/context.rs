//! Shared dependencies of the campaign flow and the follow-up engine.

use std::sync::Arc;
use std::time::Duration;

use outreach_core::config::{FollowupRetry, OutreachConfig};
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{OutreachClient, PeopleFinder, TemplateRenderer};
use outreach_core::types::OwnerProfile;

use crate::notify::StatusRouter;
use crate::persistence::OutreachDb;

/// Timing and policy knobs taken from [`OutreachConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub followup_delay: chrono::Duration,
    pub poll_interval: Duration,
    pub send_timeout: Duration,
    pub find_timeout: Duration,
    pub send_spacing: Duration,
    pub followup_retry: FollowupRetry,
}

impl EngineSettings {
    pub fn from_config(config: &OutreachConfig) -> Self {
        Self {
            followup_delay: config.followup_delay(),
            poll_interval: config.poll_interval(),
            send_timeout: config.send_timeout(),
            find_timeout: config.find_timeout(),
            send_spacing: config.send_spacing(),
            followup_retry: config.followup_retry,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&OutreachConfig::default())
    }
}

/// Store, collaborators and settings, shared by every operation.
pub struct OutreachContext {
    pub db: Arc<OutreachDb>,
    pub client: Arc<dyn OutreachClient>,
    pub finder: Arc<dyn PeopleFinder>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub status: StatusRouter,
    pub settings: EngineSettings,
    /// Profile from the config file, used when an owner has none stored.
    pub default_profile: OwnerProfile,
}

impl OutreachContext {
    pub fn new(
        config: &OutreachConfig,
        db: Arc<OutreachDb>,
        client: Arc<dyn OutreachClient>,
        finder: Arc<dyn PeopleFinder>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            db,
            client,
            finder,
            renderer,
            status: StatusRouter::new(),
            settings: EngineSettings::from_config(config),
            default_profile: config.profile.clone(),
        }
    }

    /// Profile used to sign emails for `owner_user_id`.
    ///
    /// A stored profile wins. Otherwise the configured profile applies when it
    /// names this owner or names nobody.
    pub fn resolve_owner(&self, owner_user_id: &str) -> Result<OwnerProfile> {
        if let Some(profile) = self.db.owner_profile(owner_user_id)? {
            return Ok(profile);
        }
        let configured = &self.default_profile.owner_user_id;
        if configured.is_empty() || configured == owner_user_id {
            return Ok(OwnerProfile {
                owner_user_id: owner_user_id.to_string(),
                ..self.default_profile.clone()
            });
        }
        Err(OutreachError::validation(format!(
            "no profile for owner '{owner_user_id}'"
        )))
    }
}
