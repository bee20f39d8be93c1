//! In-process fakes for the capability traits.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use outreach_core::config::OutreachConfig;
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{OutreachClient, PeopleFinder, RenderContext, TemplateRenderer};
use outreach_core::types::{
    Contact, EmailKind, FoundPerson, OwnerProfile, RenderedEmail, SendResult,
};

use crate::context::OutreachContext;
use crate::persistence::OutreachDb;

/// Records every send; fails for configured addresses; optionally slow.
#[derive(Default)]
pub struct FakeClient {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub started: AtomicUsize,
    pub fail_for: Mutex<HashSet<String>>,
    pub latency: Duration,
    pub panic_on_send: AtomicBool,
}

impl FakeClient {
    pub fn slow(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    pub fn fail_for(&self, email: &str) {
        self.fail_for.lock().unwrap().insert(email.to_string());
    }

    pub fn heal(&self) {
        self.fail_for.lock().unwrap().clear();
    }

    /// Subjects sent to one contact.
    pub fn sent_to(&self, contact_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == contact_id)
            .map(|(_, subject)| subject.clone())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl OutreachClient for FakeClient {
    fn name(&self) -> &str {
        "fake"
    }

    async fn send(&self, contact: &Contact, email: &RenderedEmail) -> SendResult {
        self.started.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_send.load(Ordering::SeqCst) {
            panic!("client crashed mid-send");
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_for.lock().unwrap().contains(&contact.email_address) {
            return SendResult::Error("mailbox unavailable".into());
        }
        self.sent
            .lock()
            .unwrap()
            .push((contact.id, email.subject.clone()));
        SendResult::Ok
    }
}

/// Returns a fixed list of people, or a transport error.
pub struct FakeFinder {
    pub people: Vec<FoundPerson>,
    pub fail: bool,
}

#[async_trait]
impl PeopleFinder for FakeFinder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn find(&self, _company: &str, _title: &str) -> Result<Vec<FoundPerson>> {
        if self.fail {
            return Err(OutreachError::transport("people API unreachable"));
        }
        Ok(self.people.clone())
    }
}

/// Subject is "<kind> for <first name>"; rejects owners without a name.
pub struct FakeRenderer;

impl TemplateRenderer for FakeRenderer {
    fn render(&self, kind: EmailKind, ctx: RenderContext<'_>) -> Result<RenderedEmail> {
        if ctx.owner.name.is_empty() {
            return Err(OutreachError::validation("owner name is required"));
        }
        Ok(RenderedEmail {
            subject: format!("{kind} for {}", ctx.contact.first_name()),
            body: format!("Hi {}, regards {}", ctx.contact.first_name(), ctx.owner.name),
        })
    }
}

pub fn person(name: &str, email: &str) -> FoundPerson {
    FoundPerson {
        name: name.into(),
        email_address: email.into(),
        title: "Engineer".into(),
        ..Default::default()
    }
}

pub fn people(n: usize) -> Vec<FoundPerson> {
    (0..n)
        .map(|i| person(&format!("Person {i}"), &format!("p{i}@acme.io")))
        .collect()
}

/// Config with no pauses between sends and a named default profile.
pub fn test_config() -> OutreachConfig {
    OutreachConfig {
        send_spacing_ms: 0,
        send_timeout_secs: 5,
        profile: OwnerProfile {
            owner_user_id: "me".into(),
            name: "Sam Sender".into(),
            email: "sam@example.com".into(),
            linkedin: String::new(),
            skills: vec!["Rust".into()],
        },
        ..Default::default()
    }
}

pub fn context(
    config: &OutreachConfig,
    client: Arc<FakeClient>,
    people: Vec<FoundPerson>,
) -> Arc<OutreachContext> {
    Arc::new(OutreachContext::new(
        config,
        Arc::new(OutreachDb::open_in_memory().unwrap()),
        client,
        Arc::new(FakeFinder {
            people,
            fail: false,
        }),
        Arc::new(FakeRenderer),
    ))
}
