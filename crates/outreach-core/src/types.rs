//! Domain types: campaigns, contacts, email records and batch outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OutreachError;

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Completed,
    Archived,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CampaignStatus::Active),
            "completed" => Ok(CampaignStatus::Completed),
            "archived" => Ok(CampaignStatus::Archived),
            other => Err(OutreachError::validation(format!(
                "unknown campaign status '{other}'"
            ))),
        }
    }
}

/// One outreach effort targeting a company/role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub owner_user_id: String,
    pub company: String,
    pub job_title: String,
    pub job_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: CampaignStatus,
}

/// A person discovered as a send target within a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub campaign_id: i64,
    pub name: String,
    pub email_address: String,
    pub title: String,
    pub company: String,
    pub linkedin_url: Option<String>,
    /// Identifier of the person in the finder's data source.
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// First word of the name, or "there" for nameless contacts.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("there")
    }
}

/// A candidate returned by a [`crate::traits::PeopleFinder`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoundPerson {
    pub name: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
}

impl FoundPerson {
    /// Normalised address if this person can actually be emailed.
    ///
    /// People-data exports hand out placeholder addresses for records whose
    /// email has not been unlocked; those are treated as missing.
    pub fn usable_email(&self) -> Option<String> {
        let email = self.email_address.trim().to_lowercase();
        if email.is_empty()
            || !email.contains('@')
            || email.contains("email_not_unlocked")
            || email.ends_with("@domain.com")
        {
            return None;
        }
        Some(email)
    }
}

/// Which message of the two-step sequence a record is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    Initial,
    Followup,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::Initial => "initial",
            EmailKind::Followup => "followup",
        }
    }
}

impl std::fmt::Display for EmailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmailKind {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(EmailKind::Initial),
            "followup" => Ok(EmailKind::Followup),
            other => Err(OutreachError::validation(format!(
                "unknown email kind '{other}'"
            ))),
        }
    }
}

/// Delivery status of an email record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Claimed by a sender; the send is in flight.
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(OutreachError::validation(format!(
                "unknown delivery status '{other}'"
            ))),
        }
    }
}

/// Durable log entry for one attempted send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: i64,
    pub campaign_id: i64,
    pub contact_id: i64,
    pub kind: EmailKind,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// Set when the send succeeded.
    pub sent_at: Option<DateTime<Utc>>,
    pub delivery_status: DeliveryStatus,
    /// Failure reason for `failed` records.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile of the campaign owner, used to sign outgoing emails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerProfile {
    #[serde(default)]
    pub owner_user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Subject and body produced by a [`crate::traits::TemplateRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Outcome of a single `OutreachClient::send` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendResult {
    Ok,
    Error(String),
}

impl SendResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, SendResult::Ok)
    }
}

/// Aggregate outcome of an initial-send batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub sent: usize,
    pub failed: usize,
    /// Contacts already holding a record of this kind (conflicts).
    pub skipped: usize,
}

impl BatchSummary {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

/// Aggregate outcome of one scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Due contacts another actor claimed first.
    pub conflicts: usize,
}

/// Per-campaign counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub contacts: usize,
    pub initial_sent: usize,
    pub initial_failed: usize,
    pub followups_sent: usize,
    pub followups_failed: usize,
    pub pending: usize,
}

impl CampaignStats {
    /// Share of successful initials that have received a follow-up, in percent.
    pub fn followup_rate(&self) -> f64 {
        if self.initial_sent == 0 {
            return 0.0;
        }
        self.followups_sent as f64 / self.initial_sent as f64 * 100.0
    }
}

/// Derived lifecycle state of a contact. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactState {
    NoEmailSent,
    /// A send (initial or follow-up) is claimed and in flight.
    InFlight,
    InitialFailed,
    InitialSent,
    FollowupDue,
    FollowupSent,
    FollowupFailed,
}

impl ContactState {
    /// Derive the state from a contact's records at `now`.
    pub fn derive(
        initial: Option<&EmailRecord>,
        followup: Option<&EmailRecord>,
        now: DateTime<Utc>,
        delay: chrono::Duration,
    ) -> Self {
        let Some(initial) = initial else {
            return ContactState::NoEmailSent;
        };
        match initial.delivery_status {
            DeliveryStatus::Pending => return ContactState::InFlight,
            DeliveryStatus::Failed => return ContactState::InitialFailed,
            DeliveryStatus::Sent => {}
        }
        match followup.map(|f| f.delivery_status) {
            Some(DeliveryStatus::Sent) => ContactState::FollowupSent,
            Some(DeliveryStatus::Failed) => ContactState::FollowupFailed,
            Some(DeliveryStatus::Pending) => ContactState::InFlight,
            None => match initial.sent_at {
                Some(sent_at) if now - sent_at >= delay => ContactState::FollowupDue,
                _ => ContactState::InitialSent,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        kind: EmailKind,
        status: DeliveryStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> EmailRecord {
        EmailRecord {
            id: 1,
            campaign_id: 1,
            contact_id: 1,
            kind,
            subject: None,
            body: None,
            sent_at,
            delivery_status: status,
            error: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_usable_email_filters_placeholders() {
        let mut p = FoundPerson {
            name: "Ada".into(),
            email_address: "  Ada@Example.COM ".into(),
            ..Default::default()
        };
        assert_eq!(p.usable_email().as_deref(), Some("ada@example.com"));

        p.email_address = "email_not_unlocked@domain.com".into();
        assert!(p.usable_email().is_none());
        p.email_address = "someone@domain.com".into();
        assert!(p.usable_email().is_none());
        p.email_address = "".into();
        assert!(p.usable_email().is_none());
        p.email_address = "not-an-address".into();
        assert!(p.usable_email().is_none());
    }

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!("archived".parse::<CampaignStatus>().unwrap(), CampaignStatus::Archived);
        assert_eq!("followup".parse::<EmailKind>().unwrap(), EmailKind::Followup);
        assert_eq!("pending".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Pending);
        assert!("bogus".parse::<DeliveryStatus>().is_err());
    }

    #[test]
    fn test_contact_state_derivation() {
        let delay = chrono::Duration::days(1);
        let t = Utc::now();

        assert_eq!(ContactState::derive(None, None, t, delay), ContactState::NoEmailSent);

        let failed = record(EmailKind::Initial, DeliveryStatus::Failed, None);
        assert_eq!(
            ContactState::derive(Some(&failed), None, t, delay),
            ContactState::InitialFailed
        );

        let sent = record(EmailKind::Initial, DeliveryStatus::Sent, Some(t));
        assert_eq!(ContactState::derive(Some(&sent), None, t, delay), ContactState::InitialSent);
        assert_eq!(
            ContactState::derive(
                Some(&sent),
                None,
                t + delay - chrono::Duration::seconds(1),
                delay
            ),
            ContactState::InitialSent
        );
        assert_eq!(
            ContactState::derive(Some(&sent), None, t + delay, delay),
            ContactState::FollowupDue
        );

        let fu = record(EmailKind::Followup, DeliveryStatus::Sent, Some(t + delay));
        assert_eq!(
            ContactState::derive(Some(&sent), Some(&fu), t + delay, delay),
            ContactState::FollowupSent
        );
    }

    #[test]
    fn test_first_name_fallback() {
        let mut c = Contact {
            id: 1,
            campaign_id: 1,
            name: "Grace Hopper".into(),
            email_address: "grace@navy.mil".into(),
            title: "Rear Admiral".into(),
            company: "Navy".into(),
            linkedin_url: None,
            source_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(c.first_name(), "Grace");
        c.name = "   ".into();
        assert_eq!(c.first_name(), "there");
    }

    #[test]
    fn test_followup_rate() {
        let stats = CampaignStats {
            initial_sent: 4,
            followups_sent: 1,
            ..Default::default()
        };
        assert!((stats.followup_rate() - 25.0).abs() < f64::EPSILON);
        assert_eq!(CampaignStats::default().followup_rate(), 0.0);
    }
}
