//! Claim, send, finalise: the single path every email goes through.

use chrono::Utc;
use outreach_core::config::FollowupRetry;
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::RenderContext;
use outreach_core::types::{
    Campaign, CampaignStatus, Contact, ContactState, EmailKind, OwnerProfile, SendResult,
};

use crate::context::OutreachContext;
use crate::notify::{StatusKind, StatusUpdate};

/// Per-contact result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { record_id: i64 },
    Failed { record_id: i64, reason: String },
    /// Another actor holds the record for this email; nothing was sent.
    Conflict,
    /// Rendering rejected the contact; nothing was claimed or sent.
    Invalid(String),
}

/// How the email record is claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    Insert,
    /// Re-claim an existing failed follow-up row.
    Reclaim,
}

/// Render, claim, send and finalise one email.
///
/// Only store failures are returned as `Err`; everything that concerns this
/// contact alone is folded into the returned [`Delivery`].
pub(crate) async fn deliver(
    ctx: &OutreachContext,
    campaign: &Campaign,
    contact: &Contact,
    owner: &OwnerProfile,
    kind: EmailKind,
    claim: Claim,
) -> Result<Delivery> {
    let rendered = match ctx.renderer.render(
        kind,
        RenderContext {
            contact,
            campaign,
            owner,
        },
    ) {
        Ok(rendered) => rendered,
        Err(e) if e.is_per_contact() => {
            tracing::warn!(
                "⚠️ Skipping {} email to {}: {e}",
                kind,
                contact.email_address
            );
            return Ok(Delivery::Invalid(e.to_string()));
        }
        Err(e) => return Err(e),
    };

    let claimed = match claim {
        Claim::Insert => ctx.db.claim_email(campaign.id, contact.id, kind, &rendered),
        Claim::Reclaim => ctx
            .db
            .reclaim_failed_followup(campaign.id, contact.id, &rendered),
    };
    let record_id = match claimed {
        Ok(id) => id,
        Err(OutreachError::Conflict(reason)) => {
            tracing::debug!("⏭️ {reason}");
            ctx.status.publish(
                StatusUpdate::new(StatusKind::EmailSkipped, reason)
                    .campaign(campaign.id)
                    .contact(contact.id),
            );
            return Ok(Delivery::Conflict);
        }
        Err(e) => return Err(e),
    };

    let outcome = match tokio::time::timeout(
        ctx.settings.send_timeout,
        ctx.client.send(contact, &rendered),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => SendResult::Error(format!(
            "send timed out after {}s",
            ctx.settings.send_timeout.as_secs()
        )),
    };

    match outcome {
        SendResult::Ok => {
            ctx.db.finalize_sent(record_id, Utc::now())?;
            tracing::info!(
                "📧 {} email sent to {} ({}) via {}",
                kind,
                contact.name,
                contact.email_address,
                ctx.client.name()
            );
            ctx.status.publish(
                StatusUpdate::new(
                    StatusKind::EmailSent,
                    format!("{kind} email sent to {}", contact.email_address),
                )
                .campaign(campaign.id)
                .contact(contact.id),
            );
            Ok(Delivery::Sent { record_id })
        }
        SendResult::Error(reason) => {
            ctx.db.finalize_failed(record_id, &reason)?;
            tracing::warn!(
                "⚠️ {} email to {} failed: {}",
                kind,
                contact.email_address,
                reason
            );
            ctx.status.publish(
                StatusUpdate::new(
                    StatusKind::EmailFailed,
                    format!("{kind} email to {} failed: {reason}", contact.email_address),
                )
                .campaign(campaign.id)
                .contact(contact.id),
            );
            Ok(Delivery::Failed { record_id, reason })
        }
    }
}

/// A state from which no further automatic send will happen.
fn is_terminal(state: ContactState, retry: FollowupRetry) -> bool {
    match state {
        ContactState::InitialFailed | ContactState::FollowupSent => true,
        ContactState::FollowupFailed => retry == FollowupRetry::OneShot,
        _ => false,
    }
}

/// Mark an active campaign `completed` once every contact is terminal.
pub(crate) fn complete_if_settled(ctx: &OutreachContext, campaign_id: i64) -> Result<bool> {
    let campaign = ctx.db.get_campaign(campaign_id)?;
    if campaign.status != CampaignStatus::Active {
        return Ok(false);
    }
    let records = ctx.db.contact_records(campaign_id)?;
    if records.is_empty() {
        return Ok(false);
    }
    let now = Utc::now();
    let settled = records.iter().all(|r| {
        let state = ContactState::derive(
            r.initial.as_ref(),
            r.followup.as_ref(),
            now,
            ctx.settings.followup_delay,
        );
        is_terminal(state, ctx.settings.followup_retry)
    });
    if settled && ctx.db.complete_campaign(campaign_id)? {
        tracing::info!(
            "🏁 Campaign {} ({} / {}) completed",
            campaign_id,
            campaign.company,
            campaign.job_title
        );
        ctx.status.publish(
            StatusUpdate::new(StatusKind::CampaignCompleted, "all contacts settled")
                .campaign(campaign_id),
        );
        return Ok(true);
    }
    Ok(false)
}
