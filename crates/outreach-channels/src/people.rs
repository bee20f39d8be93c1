//! People finder backed by a JSON export of a people-data service.
//!
//! The file holds an array of `{name, email, title, company, linkedin_url, id}`
//! objects. It is re-read on every search so edits apply without a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::PeopleFinder;
use outreach_core::types::FoundPerson;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PersonRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl From<PersonRecord> for FoundPerson {
    fn from(r: PersonRecord) -> Self {
        FoundPerson {
            name: r.name,
            email_address: r.email.unwrap_or_default(),
            title: r.title,
            company: r.company,
            linkedin_url: r.linkedin_url,
            source_id: r.id,
        }
    }
}

pub struct JsonFilePeopleFinder {
    path: PathBuf,
    limit: usize,
}

impl JsonFilePeopleFinder {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn matches(record: &PersonRecord, company: &str, title: &str) -> bool {
    let company_ok = record
        .company
        .as_deref()
        .is_some_and(|c| c.trim().eq_ignore_ascii_case(company.trim()));
    let title_ok = record
        .title
        .to_lowercase()
        .contains(&title.trim().to_lowercase());
    company_ok && title_ok
}

#[async_trait]
impl PeopleFinder for JsonFilePeopleFinder {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn find(&self, company: &str, title: &str) -> Result<Vec<FoundPerson>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            OutreachError::transport(format!(
                "Failed to read people data {}: {e}",
                self.path.display()
            ))
        })?;
        let records: Vec<PersonRecord> = serde_json::from_str(&raw).map_err(|e| {
            OutreachError::transport(format!(
                "Failed to parse people data {}: {e}",
                self.path.display()
            ))
        })?;

        let found: Vec<FoundPerson> = records
            .into_iter()
            .filter(|r| matches(r, company, title))
            .take(self.limit)
            .map(FoundPerson::from)
            .collect();
        tracing::debug!("🔎 {} people at {} matching '{}'", found.len(), company, title);
        Ok(found)
    }
}
