//! Backend collaborators for the prayer admin dashboard
//!
//! The dashboard reads and writes through the traits in [`service`]. Two
//! implementations are provided: [`RestClient`], which speaks to the hosted
//! backend over HTTP, and [`MockBackend`], an in-memory stand-in for tests.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::significant_drop_tightening
)]

pub mod error;
pub mod mock;
pub mod rest;
pub mod service;

pub use error::{BackendError, BackendResult};
pub use mock::{MockBackend, MockCall, MockOperation};
pub use rest::RestClient;
pub use service::{
    AuthProvider, HealthProbe, ModerationBackend, ModerationKind, PrayerTypeStore, SettingsStore,
    list_pending_as,
};
