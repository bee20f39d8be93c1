//! SQLite-backed store for campaigns, contacts, email records and owner profiles.
//!
//! The `(campaign_id, contact_id, kind)` uniqueness constraint on
//! `email_records` is what keeps every contact at one initial and one
//! follow-up record. Every send claims its row first; a rejected claim
//! surfaces as [`OutreachError::Conflict`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use outreach_core::config::FollowupRetry;
use outreach_core::error::{OutreachError, Result};
use outreach_core::types::{
    Campaign, CampaignStats, CampaignStatus, Contact, DeliveryStatus, EmailKind, EmailRecord,
    OwnerProfile, RenderedEmail,
};
use rusqlite::{Connection, OptionalExtension, params};

/// Contact fields accepted on insert.
#[derive(Debug, Clone)]
pub struct NewContact<'a> {
    pub name: &'a str,
    pub email_address: &'a str,
    pub title: &'a str,
    pub company: &'a str,
    pub linkedin_url: Option<&'a str>,
    pub source_id: Option<&'a str>,
}

/// An initial email old enough to be followed up.
#[derive(Debug, Clone, PartialEq)]
pub struct DueFollowup {
    pub campaign_id: i64,
    pub contact_id: i64,
    pub initial_sent_at: DateTime<Utc>,
    /// A failed follow-up row exists and must be re-claimed instead of inserted.
    pub retry: bool,
}

/// A contact together with its (at most two) email records.
#[derive(Debug, Clone)]
pub struct ContactRecords {
    pub contact: Contact,
    pub initial: Option<EmailRecord>,
    pub followup: Option<EmailRecord>,
}

/// Outreach database.
pub struct OutreachDb {
    conn: Mutex<Connection>,
}

const CAMPAIGN_COLUMNS: &str =
    "id, owner_user_id, company, job_title, job_description, status, created_at";
const CONTACT_COLUMNS: &str =
    "id, campaign_id, name, email, title, company, linkedin_url, source_id, created_at";
const RECORD_COLUMNS: &str = "id, campaign_id, contact_id, kind, subject, body, sent_at, \
     delivery_status, error, created_at";

/// Timestamps are stored as fixed-width UTC RFC 3339 so text comparison orders them.
pub(crate) fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn db_err(context: &'static str) -> impl Fn(rusqlite::Error) -> OutreachError {
    move |e| OutreachError::database(format!("{context}: {e}"))
}

/// Map an insert failure, turning UNIQUE violations into `Conflict`.
fn insert_err(e: rusqlite::Error, conflict: impl FnOnce() -> String) -> OutreachError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            OutreachError::Conflict(conflict())
        }
        _ => OutreachError::database(format!("Insert: {e}")),
    }
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn ts_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn opt_ts_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| conversion_err(idx, e))
    })
    .transpose()
}

fn enum_col<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = OutreachError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_err(idx, e))
}

fn row_to_campaign(row: &rusqlite::Row) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        owner_user_id: row.get(1)?,
        company: row.get(2)?,
        job_title: row.get(3)?,
        job_description: row.get(4)?,
        status: enum_col(row, 5)?,
        created_at: ts_col(row, 6)?,
    })
}

fn row_to_contact(row: &rusqlite::Row) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        name: row.get(2)?,
        email_address: row.get(3)?,
        title: row.get(4)?,
        company: row.get(5)?,
        linkedin_url: row.get(6)?,
        source_id: row.get(7)?,
        created_at: ts_col(row, 8)?,
    })
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<EmailRecord> {
    Ok(EmailRecord {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        contact_id: row.get(2)?,
        kind: enum_col(row, 3)?,
        subject: row.get(4)?,
        body: row.get(5)?,
        sent_at: opt_ts_col(row, 6)?,
        delivery_status: enum_col(row, 7)?,
        error: row.get(8)?,
        created_at: ts_col(row, 9)?,
    })
}

impl OutreachDb {
    /// Open or create the database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err("DB open"))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(db_err("DB pragma"))?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err("DB open"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err("DB pragma"))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| OutreachError::database(format!("Lock: {e}")))
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<()> {
        self.lock()?
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS campaigns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_user_id TEXT NOT NULL,
                company TEXT NOT NULL,
                job_title TEXT NOT NULL,
                job_description TEXT,
                status TEXT NOT NULL DEFAULT 'active',   -- active, completed, archived
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                campaign_id INTEGER NOT NULL REFERENCES campaigns(id),
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                company TEXT NOT NULL DEFAULT '',
                linkedin_url TEXT,
                source_id TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(campaign_id, email)
            );

            -- Append-only send log. One row per (contact, kind).
            CREATE TABLE IF NOT EXISTS email_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                campaign_id INTEGER NOT NULL REFERENCES campaigns(id),
                contact_id INTEGER NOT NULL REFERENCES contacts(id),
                kind TEXT NOT NULL,                      -- initial, followup
                subject TEXT,
                body TEXT,
                sent_at TEXT,
                delivery_status TEXT NOT NULL DEFAULT 'pending',  -- pending, sent, failed
                error TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(campaign_id, contact_id, kind)
            );
            CREATE INDEX IF NOT EXISTS idx_email_records_due
                ON email_records(kind, delivery_status, sent_at);

            CREATE TABLE IF NOT EXISTS owner_profiles (
                owner_user_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL DEFAULT '',
                linkedin TEXT NOT NULL DEFAULT '',
                skills TEXT NOT NULL DEFAULT '[]',       -- JSON array
                updated_at TEXT NOT NULL
            );
         ",
            )
            .map_err(db_err("Migration"))?;
        Ok(())
    }

    // ─── Campaigns ────────────────────────────────────────────

    pub fn create_campaign(
        &self,
        owner_user_id: &str,
        company: &str,
        job_title: &str,
        job_description: Option<&str>,
    ) -> Result<Campaign> {
        let created_at = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO campaigns (owner_user_id, company, job_title, job_description, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
            params![owner_user_id, company, job_title, job_description, ts(created_at)],
        )
        .map_err(db_err("Create campaign"))?;
        Ok(Campaign {
            id: conn.last_insert_rowid(),
            owner_user_id: owner_user_id.to_string(),
            company: company.to_string(),
            job_title: job_title.to_string(),
            job_description: job_description.map(str::to_string),
            created_at,
            status: CampaignStatus::Active,
        })
    }

    pub fn get_campaign(&self, id: i64) -> Result<Campaign> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"),
            params![id],
            row_to_campaign,
        )
        .optional()
        .map_err(db_err("Get campaign"))?
        .ok_or_else(|| OutreachError::NotFound(format!("campaign {id}")))
    }

    /// Campaigns, newest first, optionally restricted to one owner.
    pub fn list_campaigns(&self, owner_user_id: Option<&str>) -> Result<Vec<Campaign>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                 WHERE ?1 IS NULL OR owner_user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))
            .map_err(db_err("List campaigns"))?;
        let campaigns = stmt
            .query_map(params![owner_user_id], row_to_campaign)
            .map_err(db_err("List campaigns"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("List campaigns"))?;
        Ok(campaigns)
    }

    pub fn set_campaign_status(&self, id: i64, status: CampaignStatus) -> Result<()> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE campaigns SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .map_err(db_err("Set campaign status"))?;
        if changed == 0 {
            return Err(OutreachError::NotFound(format!("campaign {id}")));
        }
        Ok(())
    }

    /// Move an active campaign to `completed`. Returns false if it was not active.
    pub fn complete_campaign(&self, id: i64) -> Result<bool> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE campaigns SET status = 'completed' WHERE id = ?1 AND status = 'active'",
                params![id],
            )
            .map_err(db_err("Complete campaign"))?;
        Ok(changed == 1)
    }

    // ─── Contacts ─────────────────────────────────────────────

    /// Insert a contact. A duplicate email within the campaign is a `Conflict`.
    pub fn insert_contact(&self, campaign_id: i64, new: &NewContact<'_>) -> Result<Contact> {
        let created_at = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO contacts (campaign_id, name, email, title, company, linkedin_url, source_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                campaign_id,
                new.name,
                new.email_address,
                new.title,
                new.company,
                new.linkedin_url,
                new.source_id,
                ts(created_at),
            ],
        )
        .map_err(|e| {
            insert_err(e, || {
                format!("contact {} already in campaign {campaign_id}", new.email_address)
            })
        })?;
        Ok(Contact {
            id: conn.last_insert_rowid(),
            campaign_id,
            name: new.name.to_string(),
            email_address: new.email_address.to_string(),
            title: new.title.to_string(),
            company: new.company.to_string(),
            linkedin_url: new.linkedin_url.map(str::to_string),
            source_id: new.source_id.map(str::to_string),
            created_at,
        })
    }

    pub fn get_contact(&self, id: i64) -> Result<Contact> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
            params![id],
            row_to_contact,
        )
        .optional()
        .map_err(db_err("Get contact"))?
        .ok_or_else(|| OutreachError::NotFound(format!("contact {id}")))
    }

    pub fn list_contacts(&self, campaign_id: i64) -> Result<Vec<Contact>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts WHERE campaign_id = ?1 ORDER BY id"
            ))
            .map_err(db_err("List contacts"))?;
        let contacts = stmt
            .query_map(params![campaign_id], row_to_contact)
            .map_err(db_err("List contacts"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("List contacts"))?;
        Ok(contacts)
    }

    // ─── Email records ────────────────────────────────────────

    /// Claim the right to send `kind` to a contact by inserting a `pending` row.
    ///
    /// Only the caller whose insert succeeds may send. Everyone else gets
    /// `Conflict`.
    pub fn claim_email(
        &self,
        campaign_id: i64,
        contact_id: i64,
        kind: EmailKind,
        email: &RenderedEmail,
    ) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO email_records (campaign_id, contact_id, kind, subject, body, delivery_status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
            params![
                campaign_id,
                contact_id,
                kind.as_str(),
                email.subject,
                email.body,
                ts(Utc::now()),
            ],
        )
        .map_err(|e| {
            insert_err(e, || {
                format!("{kind} email already recorded for contact {contact_id}")
            })
        })?;
        Ok(conn.last_insert_rowid())
    }

    /// Re-claim a failed follow-up row with a `failed -> pending` compare-and-set.
    pub fn reclaim_failed_followup(
        &self,
        campaign_id: i64,
        contact_id: i64,
        email: &RenderedEmail,
    ) -> Result<i64> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE email_records
                 SET delivery_status = 'pending', error = NULL, subject = ?3, body = ?4, created_at = ?5
                 WHERE campaign_id = ?1 AND contact_id = ?2 AND kind = 'followup'
                   AND delivery_status = 'failed'",
                params![campaign_id, contact_id, email.subject, email.body, ts(Utc::now())],
            )
            .map_err(db_err("Reclaim follow-up"))?;
        if changed != 1 {
            return Err(OutreachError::Conflict(format!(
                "follow-up for contact {contact_id} is no longer in failed state"
            )));
        }
        conn.query_row(
            "SELECT id FROM email_records WHERE campaign_id = ?1 AND contact_id = ?2 AND kind = 'followup'",
            params![campaign_id, contact_id],
            |row| row.get(0),
        )
        .map_err(db_err("Reclaim follow-up"))
    }

    /// Finalise a claimed row as sent.
    pub fn finalize_sent(&self, record_id: i64, sent_at: DateTime<Utc>) -> Result<()> {
        self.finalize(record_id, DeliveryStatus::Sent, Some(sent_at), None)
    }

    /// Finalise a claimed row as failed.
    pub fn finalize_failed(&self, record_id: i64, reason: &str) -> Result<()> {
        self.finalize(record_id, DeliveryStatus::Failed, None, Some(reason))
    }

    fn finalize(
        &self,
        record_id: i64,
        status: DeliveryStatus,
        sent_at: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) -> Result<()> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE email_records SET delivery_status = ?2, sent_at = ?3, error = ?4
                 WHERE id = ?1 AND delivery_status = 'pending'",
                params![record_id, status.as_str(), sent_at.map(ts), error],
            )
            .map_err(db_err("Finalize record"))?;
        if changed == 0 {
            return Err(OutreachError::NotFound(format!(
                "pending email record {record_id}"
            )));
        }
        Ok(())
    }

    pub fn get_record(
        &self,
        campaign_id: i64,
        contact_id: i64,
        kind: EmailKind,
    ) -> Result<Option<EmailRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM email_records
                 WHERE campaign_id = ?1 AND contact_id = ?2 AND kind = ?3"
            ),
            params![campaign_id, contact_id, kind.as_str()],
            row_to_record,
        )
        .optional()
        .map_err(db_err("Get record"))
    }

    /// Every email record of a campaign in creation order.
    pub fn list_email_history(&self, campaign_id: i64) -> Result<Vec<EmailRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM email_records WHERE campaign_id = ?1 ORDER BY id"
            ))
            .map_err(db_err("List history"))?;
        let records = stmt
            .query_map(params![campaign_id], row_to_record)
            .map_err(db_err("List history"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("List history"))?;
        Ok(records)
    }

    /// Successful initials in active campaigns whose follow-up is due at `now`.
    ///
    /// Due means `sent_at <= now - delay` and no follow-up row exists, or,
    /// under `RetryUntilSent`, the follow-up row is `failed`.
    pub fn due_followups(
        &self,
        now: DateTime<Utc>,
        delay: chrono::Duration,
        retry: FollowupRetry,
    ) -> Result<Vec<DueFollowup>> {
        // A cutoff before the representable range means nothing is due yet.
        let Some(cutoff) = now.checked_sub_signed(delay) else {
            return Ok(Vec::new());
        };
        let cutoff = ts(cutoff);
        let retry_failed = matches!(retry, FollowupRetry::RetryUntilSent);
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT i.campaign_id, i.contact_id, i.sent_at, f.id IS NOT NULL
                 FROM email_records i
                 JOIN campaigns c ON c.id = i.campaign_id
                 LEFT JOIN email_records f
                   ON f.campaign_id = i.campaign_id AND f.contact_id = i.contact_id
                  AND f.kind = 'followup'
                 WHERE i.kind = 'initial' AND i.delivery_status = 'sent'
                   AND i.sent_at <= ?1 AND c.status = 'active'
                   AND (f.id IS NULL OR (?2 AND f.delivery_status = 'failed'))
                 ORDER BY i.sent_at, i.id",
            )
            .map_err(db_err("Due follow-ups"))?;
        let due = stmt
            .query_map(params![cutoff, retry_failed], |row| {
                Ok(DueFollowup {
                    campaign_id: row.get(0)?,
                    contact_id: row.get(1)?,
                    initial_sent_at: ts_col(row, 2)?,
                    retry: row.get(3)?,
                })
            })
            .map_err(db_err("Due follow-ups"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Due follow-ups"))?;
        Ok(due)
    }

    /// Fail `pending` rows created before `older_than`. Such rows belong to a
    /// sender that died between claim and finalise.
    pub fn fail_stale_pending(&self, older_than: DateTime<Utc>) -> Result<usize> {
        self.lock()?
            .execute(
                "UPDATE email_records SET delivery_status = 'failed', error = 'interrupted before completion'
                 WHERE delivery_status = 'pending' AND created_at < ?1",
                params![ts(older_than)],
            )
            .map_err(db_err("Fail stale pending"))
    }

    /// Each contact of a campaign with its initial and follow-up records.
    pub fn contact_records(&self, campaign_id: i64) -> Result<Vec<ContactRecords>> {
        let contacts = self.list_contacts(campaign_id)?;
        let mut by_contact: HashMap<i64, (Option<EmailRecord>, Option<EmailRecord>)> =
            HashMap::new();
        for record in self.list_email_history(campaign_id)? {
            let slot = by_contact.entry(record.contact_id).or_default();
            match record.kind {
                EmailKind::Initial => slot.0 = Some(record),
                EmailKind::Followup => slot.1 = Some(record),
            }
        }
        Ok(contacts
            .into_iter()
            .map(|contact| {
                let (initial, followup) = by_contact.remove(&contact.id).unwrap_or_default();
                ContactRecords {
                    contact,
                    initial,
                    followup,
                }
            })
            .collect())
    }

    pub fn campaign_stats(&self, campaign_id: i64) -> Result<CampaignStats> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM contacts WHERE campaign_id = ?1),
                COALESCE(SUM(kind = 'initial' AND delivery_status = 'sent'), 0),
                COALESCE(SUM(kind = 'initial' AND delivery_status = 'failed'), 0),
                COALESCE(SUM(kind = 'followup' AND delivery_status = 'sent'), 0),
                COALESCE(SUM(kind = 'followup' AND delivery_status = 'failed'), 0),
                COALESCE(SUM(delivery_status = 'pending'), 0)
             FROM email_records WHERE campaign_id = ?1",
            params![campaign_id],
            |row| {
                let count = |idx: usize| -> rusqlite::Result<usize> {
                    Ok(row.get::<_, i64>(idx)?.max(0) as usize)
                };
                Ok(CampaignStats {
                    contacts: count(0)?,
                    initial_sent: count(1)?,
                    initial_failed: count(2)?,
                    followups_sent: count(3)?,
                    followups_failed: count(4)?,
                    pending: count(5)?,
                })
            },
        )
        .map_err(db_err("Campaign stats"))
    }

    // ─── Owner profiles ───────────────────────────────────────

    pub fn upsert_owner_profile(&self, profile: &OwnerProfile) -> Result<()> {
        let skills = serde_json::to_string(&profile.skills)
            .map_err(|e| OutreachError::database(format!("Encode skills: {e}")))?;
        self.lock()?
            .execute(
                "INSERT INTO owner_profiles (owner_user_id, name, email, linkedin, skills, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(owner_user_id) DO UPDATE SET
                    name = excluded.name, email = excluded.email, linkedin = excluded.linkedin,
                    skills = excluded.skills, updated_at = excluded.updated_at",
                params![
                    profile.owner_user_id,
                    profile.name,
                    profile.email,
                    profile.linkedin,
                    skills,
                    ts(Utc::now()),
                ],
            )
            .map_err(db_err("Upsert owner profile"))?;
        Ok(())
    }

    pub fn owner_profile(&self, owner_user_id: &str) -> Result<Option<OwnerProfile>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT owner_user_id, name, email, linkedin, skills FROM owner_profiles WHERE owner_user_id = ?1",
            params![owner_user_id],
            |row| {
                let skills: String = row.get(4)?;
                Ok(OwnerProfile {
                    owner_user_id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    linkedin: row.get(3)?,
                    skills: serde_json::from_str(&skills).map_err(|e| conversion_err(4, e))?,
                })
            },
        )
        .optional()
        .map_err(db_err("Get owner profile"))
    }
}
