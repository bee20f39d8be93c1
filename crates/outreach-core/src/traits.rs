//! Capability traits between the engine and the outside world.
//!
//! The engine never talks to SMTP servers, people-data APIs or template files
//! directly; it is handed implementations of these traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Campaign, Contact, EmailKind, FoundPerson, OwnerProfile, RenderedEmail, SendResult,
};

/// Sends one email to one contact.
///
/// Must be safe to call repeatedly. Exactly-once delivery is provided by the
/// email-record store, not by the client.
#[async_trait]
pub trait OutreachClient: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, contact: &Contact, email: &RenderedEmail) -> SendResult;
}

/// Discovers people at a company.
#[async_trait]
pub trait PeopleFinder: Send + Sync {
    fn name(&self) -> &str;

    /// Returns an empty vec for "no results". Errors only on transport or
    /// authorization failure.
    async fn find(&self, company: &str, title: &str) -> Result<Vec<FoundPerson>>;
}

/// Everything a template may reference.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub contact: &'a Contact,
    pub campaign: &'a Campaign,
    pub owner: &'a OwnerProfile,
}

/// Turns a template plus context into subject and body.
pub trait TemplateRenderer: Send + Sync {
    /// A missing required field is a `Validation` error and aborts only the
    /// contact being rendered.
    fn render(&self, kind: EmailKind, ctx: RenderContext<'_>) -> Result<RenderedEmail>;
}
