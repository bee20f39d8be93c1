//! Campaign initiation and the initial send batch.

use std::collections::HashSet;

use outreach_core::error::{OutreachError, Result};
use outreach_core::types::{BatchSummary, Campaign, CampaignStatus, EmailKind};

use crate::context::OutreachContext;
use crate::delivery::{Claim, Delivery, complete_if_settled, deliver};
use crate::notify::{StatusKind, StatusUpdate};
use crate::persistence::NewContact;

/// Create a campaign and populate it from the people finder.
///
/// The campaign row is written before the search. When the search yields no
/// contact with a usable address the campaign stays, empty, and
/// `NoContactsFound` is returned. A finder failure or timeout is a
/// `Transport` error.
pub async fn create_campaign(
    ctx: &OutreachContext,
    owner_user_id: &str,
    company: &str,
    job_title: &str,
    job_description: Option<&str>,
) -> Result<Campaign> {
    let company = company.trim();
    let job_title = job_title.trim();
    if company.is_empty() || job_title.is_empty() {
        return Err(OutreachError::validation(
            "company and job title are required",
        ));
    }

    let campaign = ctx
        .db
        .create_campaign(owner_user_id, company, job_title, job_description)?;
    tracing::info!(
        "🎯 Campaign {} created: {} @ {} (owner {})",
        campaign.id,
        job_title,
        company,
        owner_user_id
    );

    let found = match tokio::time::timeout(
        ctx.settings.find_timeout,
        ctx.finder.find(company, job_title),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            return Err(OutreachError::transport(format!(
                "{} search timed out after {}s",
                ctx.finder.name(),
                ctx.settings.find_timeout.as_secs()
            )));
        }
    };

    let mut seen = HashSet::new();
    let mut created = 0usize;
    for person in &found {
        let Some(email) = person.usable_email() else {
            tracing::debug!("⏭️ Dropping {}: no usable email", person.name);
            continue;
        };
        if !seen.insert(email.clone()) {
            continue;
        }
        let new = NewContact {
            name: person.name.trim(),
            email_address: &email,
            title: person.title.trim(),
            company: person.company.as_deref().unwrap_or(company),
            linkedin_url: person.linkedin_url.as_deref(),
            source_id: person.source_id.as_deref(),
        };
        match ctx.db.insert_contact(campaign.id, &new) {
            Ok(_) => created += 1,
            Err(e) if e.is_conflict() => tracing::debug!("⏭️ {e}"),
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        "👥 Campaign {}: {} contacts from {} results via {}",
        campaign.id,
        created,
        found.len(),
        ctx.finder.name()
    );
    if created == 0 {
        return Err(OutreachError::NoContactsFound {
            campaign_id: campaign.id,
        });
    }

    ctx.status.publish(
        StatusUpdate::new(
            StatusKind::CampaignCreated,
            format!("{job_title} @ {company}: {created} contacts"),
        )
        .campaign(campaign.id),
    );
    Ok(campaign)
}

/// Send the initial email to every contact of an active campaign.
///
/// One contact's failure never aborts the batch. Contacts that already hold
/// an initial record are counted as skipped.
pub async fn send_initial_batch(ctx: &OutreachContext, campaign_id: i64) -> Result<BatchSummary> {
    let campaign = ctx.db.get_campaign(campaign_id)?;
    if campaign.status != CampaignStatus::Active {
        return Err(OutreachError::validation(format!(
            "campaign {campaign_id} is {}",
            campaign.status
        )));
    }
    let owner = ctx.resolve_owner(&campaign.owner_user_id)?;
    let contacts = ctx.db.list_contacts(campaign_id)?;

    tracing::info!(
        "📤 Sending initial emails for campaign {} to {} contacts",
        campaign_id,
        contacts.len()
    );

    let mut summary = BatchSummary::default();
    for contact in &contacts {
        if summary.attempted() > 0 && !ctx.settings.send_spacing.is_zero() {
            tokio::time::sleep(ctx.settings.send_spacing).await;
        }
        match deliver(ctx, &campaign, contact, &owner, EmailKind::Initial, Claim::Insert).await? {
            Delivery::Sent { .. } => summary.sent += 1,
            Delivery::Failed { .. } | Delivery::Invalid(_) => summary.failed += 1,
            Delivery::Conflict => summary.skipped += 1,
        }
    }

    tracing::info!(
        "📊 Campaign {} initial batch: {} sent, {} failed, {} skipped",
        campaign_id,
        summary.sent,
        summary.failed,
        summary.skipped
    );
    complete_if_settled(ctx, campaign_id)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use outreach_core::types::DeliveryStatus;

    use super::*;
    use crate::context::OutreachContext;
    use crate::persistence::OutreachDb;
    use crate::testing::{
        FakeClient, FakeFinder, FakeRenderer, context, people, person, test_config,
    };

    #[tokio::test]
    async fn test_create_campaign_dedups_and_filters() {
        let found = vec![
            person("Ada Lovelace", "ada@acme.io"),
            person("Ada L.", " ADA@acme.io "),
            person("Locked", "email_not_unlocked@domain.com"),
            person("Nobody", ""),
            person("Grace Hopper", "grace@acme.io"),
        ];
        let ctx = context(&test_config(), Arc::new(FakeClient::default()), found);
        let campaign = create_campaign(&ctx, "me", "Acme", "Engineer", Some("Build things"))
            .await
            .unwrap();
        assert_eq!(campaign.status, CampaignStatus::Active);
        assert_eq!(campaign.job_description.as_deref(), Some("Build things"));

        let contacts = ctx.db.list_contacts(campaign.id).unwrap();
        let emails: Vec<_> = contacts.iter().map(|c| c.email_address.as_str()).collect();
        assert_eq!(emails, vec!["ada@acme.io", "grace@acme.io"]);
        assert_eq!(contacts[0].company, "Acme");
    }

    #[tokio::test]
    async fn test_no_usable_contacts_leaves_empty_campaign() {
        let found = vec![person("Locked", "someone@domain.com")];
        let ctx = context(&test_config(), Arc::new(FakeClient::default()), found);
        let err = create_campaign(&ctx, "me", "Acme", "Engineer", None)
            .await
            .unwrap_err();
        let OutreachError::NoContactsFound { campaign_id } = err else {
            panic!("expected NoContactsFound");
        };
        let campaign = ctx.db.get_campaign(campaign_id).unwrap();
        assert_eq!(campaign.status, CampaignStatus::Active);
        assert!(ctx.db.list_contacts(campaign_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finder_failure_is_transport_error() {
        let ctx = OutreachContext::new(
            &test_config(),
            Arc::new(OutreachDb::open_in_memory().unwrap()),
            Arc::new(FakeClient::default()),
            Arc::new(FakeFinder {
                people: Vec::new(),
                fail: true,
            }),
            Arc::new(FakeRenderer),
        );
        let err = create_campaign(&ctx, "me", "Acme", "Engineer", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::Transport(_)));
    }

    #[tokio::test]
    async fn test_blank_company_rejected() {
        let ctx = context(&test_config(), Arc::new(FakeClient::default()), people(1));
        let err = create_campaign(&ctx, "me", "  ", "Engineer", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::Validation(_)));
        assert!(ctx.db.list_campaigns(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort_batch() {
        let client = Arc::new(FakeClient::default());
        client.fail_for("p2@acme.io");
        let ctx = context(&test_config(), client.clone(), people(5));
        let campaign = create_campaign(&ctx, "me", "Acme", "Engineer", None)
            .await
            .unwrap();

        let summary = send_initial_batch(&ctx, campaign.id).await.unwrap();
        assert_eq!(summary.sent, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(client.sent_count(), 4);

        let history = ctx.db.list_email_history(campaign.id).unwrap();
        assert_eq!(history.len(), 5);
        let failed: Vec<_> = history
            .iter()
            .filter(|r| r.delivery_status == DeliveryStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].sent_at.is_none());
        assert_eq!(failed[0].error.as_deref(), Some("mailbox unavailable"));
    }

    #[tokio::test]
    async fn test_resending_batch_skips_recorded_contacts() {
        let client = Arc::new(FakeClient::default());
        let ctx = context(&test_config(), client.clone(), people(3));
        let campaign = create_campaign(&ctx, "me", "Acme", "Engineer", None)
            .await
            .unwrap();
        send_initial_batch(&ctx, campaign.id).await.unwrap();

        let again = send_initial_batch(&ctx, campaign.id).await.unwrap();
        assert_eq!(again.sent, 0);
        assert_eq!(again.skipped, 3);
        assert_eq!(client.sent_count(), 3);
    }

    #[tokio::test]
    async fn test_render_failure_skips_contact_without_record() {
        let mut config = test_config();
        config.profile.name.clear();
        let client = Arc::new(FakeClient::default());
        let ctx = context(&config, client.clone(), people(2));
        let campaign = create_campaign(&ctx, "me", "Acme", "Engineer", None)
            .await
            .unwrap();
        let summary = send_initial_batch(&ctx, campaign.id).await.unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(client.sent_count(), 0);
        assert!(ctx.db.list_email_history(campaign.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_failed_batch_completes_campaign() {
        let client = Arc::new(FakeClient::default());
        client.fail_for("p0@acme.io");
        let ctx = context(&test_config(), client, people(1));
        let campaign = create_campaign(&ctx, "me", "Acme", "Engineer", None)
            .await
            .unwrap();
        send_initial_batch(&ctx, campaign.id).await.unwrap();
        assert_eq!(
            ctx.db.get_campaign(campaign.id).unwrap().status,
            CampaignStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_archived_campaign_rejects_batch() {
        let ctx = context(&test_config(), Arc::new(FakeClient::default()), people(1));
        let campaign = create_campaign(&ctx, "me", "Acme", "Engineer", None)
            .await
            .unwrap();
        ctx.db
            .set_campaign_status(campaign.id, CampaignStatus::Archived)
            .unwrap();
        assert!(send_initial_batch(&ctx, campaign.id).await.is_err());
    }
}
