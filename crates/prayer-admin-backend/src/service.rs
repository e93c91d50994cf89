//! Collaborator traits implemented by backend clients
//!
//! Every dashboard component talks to the hosted backend through one of these
//! traits, which keeps the view-models testable against the in-memory
//! [`MockBackend`](crate::MockBackend) and lets the REST client be swapped.

use async_trait::async_trait;
use prayer_admin_core::{EmailSettings, NewPrayerType, PrayerType, PrayerTypeUpdate, Session};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, time::Duration};

use crate::error::BackendResult;

/// Kinds of moderated request, one backend table each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationKind {
    /// A user asked to delete a prayer
    PrayerDeletion,
    /// A user asked to delete an update on a prayer
    UpdateDeletion,
    /// A subscriber asked to change their email preference
    PreferenceChange,
}

impl ModerationKind {
    /// All kinds, in queue display order
    pub const ALL: [Self; 3] = [
        Self::PrayerDeletion,
        Self::UpdateDeletion,
        Self::PreferenceChange,
    ];

    /// Table holding requests of this kind
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::PrayerDeletion => "deletion_requests",
            Self::UpdateDeletion => "update_deletion_requests",
            Self::PreferenceChange => "preference_change_requests",
        }
    }

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PrayerDeletion => "Prayer deletion",
            Self::UpdateDeletion => "Update deletion",
            Self::PreferenceChange => "Preference change",
        }
    }
}

impl fmt::Display for ModerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ModerationKind {
    type Err = crate::BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deletion" | "prayer-deletion" => Ok(Self::PrayerDeletion),
            "update-deletion" => Ok(Self::UpdateDeletion),
            "preference" | "preference-change" => Ok(Self::PreferenceChange),
            other => Err(crate::BackendError::Validation {
                message: format!("unknown request kind '{other}'"),
            }),
        }
    }
}

/// Moderation writes and pending-queue reads
#[async_trait]
pub trait ModerationBackend: Send + Sync {
    /// Pending requests of one kind, newest first, as raw rows
    async fn list_pending(&self, kind: ModerationKind) -> BackendResult<Vec<serde_json::Value>>;

    /// Approve a pending request and apply its effect
    async fn approve(&self, kind: ModerationKind, id: &str) -> BackendResult<()>;

    /// Deny a pending request with a moderator reason
    async fn deny(&self, kind: ModerationKind, id: &str, reason: &str) -> BackendResult<()>;
}

/// Typed variant of [`ModerationBackend::list_pending`].
///
/// # Errors
///
/// Propagates backend failures and rows that do not decode into `T`.
pub async fn list_pending_as<T: DeserializeOwned>(
    backend: &dyn ModerationBackend,
    kind: ModerationKind,
) -> BackendResult<Vec<T>> {
    backend
        .list_pending(kind)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

/// Prayer-type reference data
#[async_trait]
pub trait PrayerTypeStore: Send + Sync {
    /// All records ordered by `display_order` ascending
    async fn list(&self) -> BackendResult<Vec<PrayerType>>;

    /// Insert a record
    async fn create(&self, record: &NewPrayerType) -> BackendResult<PrayerType>;

    /// Apply a partial update to one record
    async fn update(&self, id: &str, changes: &PrayerTypeUpdate) -> BackendResult<()>;

    /// Remove one record
    async fn delete(&self, id: &str) -> BackendResult<()>;
}

/// Minimal read used to infer reachability
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Read at most `limit` rows of `table` within `timeout`
    async fn probe(&self, table: &str, limit: u32, timeout: Duration) -> BackendResult<()>;
}

/// Password sign-in
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a session; `None` when they are rejected
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Option<Session>>;
}

/// Admin settings storage
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current email settings, defaults when none were saved yet
    async fn email_settings(&self) -> BackendResult<EmailSettings>;

    /// Replace the email settings
    async fn save_email_settings(&self, settings: &EmailSettings) -> BackendResult<()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_tables_are_distinct() {
        let tables: std::collections::HashSet<_> =
            ModerationKind::ALL.iter().map(|k| k.table()).collect();
        assert_eq!(tables.len(), ModerationKind::ALL.len());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(
            "deletion".parse::<ModerationKind>().unwrap(),
            ModerationKind::PrayerDeletion
        );
        assert_eq!(
            "update-deletion".parse::<ModerationKind>().unwrap(),
            ModerationKind::UpdateDeletion
        );
        assert_eq!(
            "preference".parse::<ModerationKind>().unwrap(),
            ModerationKind::PreferenceChange
        );
        assert!("prayer".parse::<ModerationKind>().is_err());
    }
}
