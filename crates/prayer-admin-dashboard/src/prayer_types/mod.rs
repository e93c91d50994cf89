//! Prayer-type reference data

pub mod cache;
pub mod manager;

pub use cache::PrayerTypeCache;
pub use manager::{ConfirmPrompt, MoveDirection, PrayerTypeForm, PrayerTypeManager, PrayerTypeRow};
