//! # Outreach Channels
//! Collaborator implementations behind the core capability traits.

pub mod email;
pub mod people;
pub mod templates;

pub use email::SmtpOutreachClient;
pub use people::JsonFilePeopleFinder;
pub use templates::FileTemplateRenderer;
