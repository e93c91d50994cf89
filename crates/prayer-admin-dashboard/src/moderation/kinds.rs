//! Kind-specific rendering for moderated requests

use chrono::{DateTime, Utc};
use prayer_admin_backend::ModerationKind;
use prayer_admin_core::{DeletionRequest, PreferenceChangeRequest, UpdateDeletionRequest};
use serde::de::DeserializeOwned;

use crate::card::CardLayout;

/// A request record a [`ModerationCard`](super::ModerationCard) can moderate
pub trait RequestKind: DeserializeOwned + Send + Sync + 'static {
    /// Backend kind the record belongs to
    const KIND: ModerationKind;

    /// Record identifier
    fn id(&self) -> &str;

    /// Fill the body slots; the card adds its error slot, form and actions
    fn layout(&self) -> CardLayout;
}

fn submitted(at: &DateTime<Utc>) -> String {
    format!("Submitted {}", at.format("%Y-%m-%d %H:%M UTC"))
}

fn requester(name: &str, email: Option<&str>) -> String {
    match email {
        Some(email) if !email.is_empty() => format!("Requested by {name} <{email}>"),
        _ => format!("Requested by {name}"),
    }
}

impl RequestKind for DeletionRequest {
    const KIND: ModerationKind = ModerationKind::PrayerDeletion;

    fn id(&self) -> &str {
        &self.id
    }

    fn layout(&self) -> CardLayout {
        let mut layout = CardLayout::new("Prayer deletion request");
        if let Some(title) = &self.prayer_title {
            layout = layout.subtitle(title.clone());
        }
        layout
            .content(format!("Prayer: {}", self.prayer_id))
            .reason(self.reason.clone())
            .meta(requester(&self.requested_by, self.requested_email.as_deref()))
            .meta(submitted(&self.created_at))
    }
}

impl RequestKind for UpdateDeletionRequest {
    const KIND: ModerationKind = ModerationKind::UpdateDeletion;

    fn id(&self) -> &str {
        &self.id
    }

    fn layout(&self) -> CardLayout {
        let mut layout = CardLayout::new("Update deletion request");
        if let Some(content) = &self.update_content {
            layout = layout.subtitle(content.clone());
        }
        layout = layout.content(format!("Update: {}", self.update_id));
        if let Some(prayer_id) = &self.prayer_id {
            layout = layout.content(format!("Prayer: {prayer_id}"));
        }
        layout
            .reason(self.reason.clone())
            .meta(requester(&self.requested_by, self.requested_email.as_deref()))
            .meta(submitted(&self.created_at))
    }
}

impl RequestKind for PreferenceChangeRequest {
    const KIND: ModerationKind = ModerationKind::PreferenceChange;

    fn id(&self) -> &str {
        &self.id
    }

    fn layout(&self) -> CardLayout {
        let preference = if self.receive_new_prayer_notifications {
            "Wants emails about new prayers"
        } else {
            "Does not want emails about new prayers"
        };

        CardLayout::new("Email preference change")
            .subtitle(self.name.clone())
            .content(format!("Email: {}", self.email))
            .content(preference)
            .meta(submitted(&self.created_at))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use prayer_admin_core::ApprovalStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deletion_layout() {
        let request = DeletionRequest {
            id: "r1".to_string(),
            prayer_id: "p1".to_string(),
            prayer_title: Some("Healing".to_string()),
            requested_by: "Ann".to_string(),
            requested_email: Some("ann@example.org".to_string()),
            reason: "dup".to_string(),
            created_at: "2024-03-01T12:00:00Z".parse().unwrap(),
            approval_status: ApprovalStatus::Pending,
            denial_reason: None,
        };

        let layout = request.layout();
        assert_eq!(layout.subtitle.as_deref(), Some("Healing"));
        assert_eq!(layout.reason.as_deref(), Some("dup"));
        assert_eq!(
            layout.meta,
            vec![
                "Requested by Ann <ann@example.org>".to_string(),
                "Submitted 2024-03-01 12:00 UTC".to_string(),
            ]
        );
    }

    #[test]
    fn test_preference_layout_has_no_reason() {
        let request = PreferenceChangeRequest {
            id: "c1".to_string(),
            name: "Bo".to_string(),
            email: "bo@example.org".to_string(),
            receive_new_prayer_notifications: false,
            created_at: Utc::now(),
            approval_status: ApprovalStatus::Pending,
            denial_reason: None,
        };

        let layout = request.layout();
        assert!(layout.reason.is_none());
        assert_eq!(layout.content.len(), 2);
        assert_eq!(request.id(), "c1");
        assert_eq!(PreferenceChangeRequest::KIND, ModerationKind::PreferenceChange);
    }
}
