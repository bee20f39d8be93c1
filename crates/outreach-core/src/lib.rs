//! # Outreach Core
//!
//! Shared vocabulary for the outreach workspace: configuration, the error
//! taxonomy, campaign/contact/email-record types and the capability traits
//! the engine is driven through.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::OutreachConfig;
pub use error::{OutreachError, Result};
pub use traits::{OutreachClient, PeopleFinder, TemplateRenderer};
