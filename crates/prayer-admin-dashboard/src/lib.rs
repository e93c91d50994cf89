//! Headless admin dashboard for the prayer request application
//!
//! Each screen is a view-model: it owns its UI state, talks to the backend
//! through the collaborator traits in `prayer_admin_backend`, and renders into
//! plain data any front end can draw. The `prayer-admin` binary drives the same
//! view-models from the command line.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::significant_drop_tightening,
    clippy::significant_drop_in_scrutinee
)]

pub mod auth;
pub mod card;
pub mod denial;
pub mod email_settings;
pub mod heartbeat;
pub mod moderation;
pub mod prayer_types;
pub mod queue;
pub mod theme;

pub use auth::{AuthGate, AuthOutcome};
pub use card::{CardAction, CardLayout};
pub use denial::DenialDraft;
pub use email_settings::EmailSettingsPanel;
pub use heartbeat::ConnectionHeartbeat;
pub use moderation::{
    BackendActions, CardOutcome, CardState, ModerationActions, ModerationCard, RequestKind,
};
pub use prayer_types::{ConfirmPrompt, PrayerTypeCache, PrayerTypeManager};
pub use queue::ModerationQueue;
pub use theme::ThemeToggle;
