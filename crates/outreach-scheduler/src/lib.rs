//! # Outreach Scheduler
//!
//! Campaign lifecycle and follow-up scheduling over a SQLite store.
//!
//! ## Architecture
//! ```text
//! OutreachService (control surface)
//!   ├── create_campaign → PeopleFinder → contacts
//!   ├── send_initial_batch → claim → OutreachClient → finalise
//!   └── start/stop_scheduler
//!         └── FollowUpEngine (tokio interval + CancellationToken)
//!               └── tick: due initials → claim follow-up → send → finalise
//!
//! every send ──► StatusRouter ──► broadcast subscribers / webhook
//! ```
//!
//! Exactly-once sending rests on one rule: a send happens only after its
//! email record was inserted as `pending`, and the store rejects a second
//! row for the same `(campaign, contact, kind)`.

pub mod campaign;
pub mod context;
pub mod delivery;
pub mod dispatch;
pub mod engine;
pub mod notify;
pub mod persistence;
pub mod service;

#[cfg(test)]
mod testing;

pub use context::{EngineSettings, OutreachContext};
pub use delivery::Delivery;
pub use engine::{FollowUpEngine, SchedulerHandle, SchedulerState, SchedulerStatus};
pub use notify::{StatusKind, StatusRouter, StatusUpdate};
pub use persistence::OutreachDb;
pub use service::OutreachService;
