//! Core data types for the prayer admin dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use validator::ValidateEmail;

use crate::{Error, Result};

/// Moderation status of a user-submitted request
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Awaiting a moderator
    #[default]
    Pending,
    /// Approved by a moderator
    Approved,
    /// Denied by a moderator
    Denied,
}

impl ApprovalStatus {
    /// Check a status transition.
    ///
    /// Only `pending -> approved` and `pending -> denied` are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] for every other pair.
    pub fn transition_to(self, next: Self) -> Result<Self> {
        match (self, next) {
            (Self::Pending, Self::Approved | Self::Denied) => Ok(next),
            _ => Err(Error::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            }),
        }
    }

    /// Whether the request still needs a decision
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Request from a user to delete one of their prayers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletionRequest {
    /// Request identifier
    pub id: String,
    /// Prayer the request targets
    pub prayer_id: String,
    /// Title of the prayer, when the backend joins it in
    #[serde(default)]
    pub prayer_title: Option<String>,
    /// Name of the requester
    pub requested_by: String,
    /// Email of the requester
    #[serde(default)]
    pub requested_email: Option<String>,
    /// Why the requester wants the prayer removed
    pub reason: String,
    /// When the request was submitted
    pub created_at: DateTime<Utc>,
    /// Moderation status
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    /// Reason given by the moderator on denial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
}

/// Request from a user to delete an update posted on a prayer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateDeletionRequest {
    /// Request identifier
    pub id: String,
    /// Update the request targets
    pub update_id: String,
    /// Prayer the update belongs to
    #[serde(default)]
    pub prayer_id: Option<String>,
    /// Text of the update, when joined in
    #[serde(default)]
    pub update_content: Option<String>,
    /// Name of the requester
    pub requested_by: String,
    /// Email of the requester
    #[serde(default)]
    pub requested_email: Option<String>,
    /// Why the requester wants the update removed
    pub reason: String,
    /// When the request was submitted
    pub created_at: DateTime<Utc>,
    /// Moderation status
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    /// Reason given by the moderator on denial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
}

/// Request from a subscriber to change their notification preference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferenceChangeRequest {
    /// Request identifier
    pub id: String,
    /// Subscriber name
    pub name: String,
    /// Subscriber email
    pub email: String,
    /// Desired preference: receive emails about new prayers
    pub receive_new_prayer_notifications: bool,
    /// When the request was submitted
    pub created_at: DateTime<Utc>,
    /// Moderation status
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    /// Reason given by the moderator on denial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
}

/// Entry of the prayer-type taxonomy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrayerType {
    /// Identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Sort key; not guaranteed unique
    pub display_order: i32,
    /// Whether the type is offered to users
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a prayer type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPrayerType {
    /// Display name, already trimmed
    pub name: String,
    /// Sort key
    pub display_order: i32,
    /// Whether the type is offered to users
    pub is_active: bool,
}

impl NewPrayerType {
    /// Build a payload, trimming and checking the name.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the trimmed name is empty.
    pub fn new(name: &str, display_order: i32, is_active: bool) -> Result<Self> {
        Ok(Self {
            name: validate_name(name)?,
            display_order,
            is_active,
        })
    }
}

/// Partial update of a prayer type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrayerTypeUpdate {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New sort key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    /// New active flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl PrayerTypeUpdate {
    /// Update that only moves the record
    #[must_use]
    pub const fn display_order(display_order: i32) -> Self {
        Self {
            name: None,
            display_order: Some(display_order),
            is_active: None,
        }
    }

    /// Update that only sets the active flag
    #[must_use]
    pub const fn active(is_active: bool) -> Self {
        Self {
            name: None,
            display_order: None,
            is_active: Some(is_active),
        }
    }

    /// Whether the update changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.display_order.is_none() && self.is_active.is_none()
    }

    /// Apply the update to a record in place
    pub fn apply_to(&self, record: &mut PrayerType) {
        if let Some(name) = &self.name {
            record.name.clone_from(name);
        }
        if let Some(order) = self.display_order {
            record.display_order = order;
        }
        if let Some(active) = self.is_active {
            record.is_active = active;
        }
    }
}

/// Trim a prayer-type name and reject blanks.
///
/// # Errors
///
/// Returns a validation error when nothing is left after trimming.
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("name", "Name is required"));
    }
    Ok(trimmed.to_string())
}

/// Sort prayer types for display.
///
/// Ascending `display_order`; duplicates fall back to name so the
/// rendered order is at least deterministic.
pub fn sort_for_display(types: &mut [PrayerType]) {
    types.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Admin email notification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailSettings {
    /// Addresses notified about new submissions
    #[serde(default)]
    pub notification_emails: Vec<String>,
    /// Whether admins are emailed when a prayer is submitted
    #[serde(default)]
    pub notify_on_new_prayer: bool,
}

impl EmailSettings {
    /// Check every configured address.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first malformed address.
    pub fn validate(&self) -> Result<()> {
        for address in &self.notification_emails {
            validate_email(address)?;
        }
        Ok(())
    }
}

/// Trim an email address and check its format.
///
/// # Errors
///
/// Returns a validation error when the address is blank or malformed.
pub fn validate_email(address: &str) -> Result<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("email", "Email is required"));
    }
    let owned = trimmed.to_string();
    if !owned.validate_email() {
        return Err(Error::validation(
            "email",
            format!("'{owned}' is not a valid email address"),
        ));
    }
    Ok(owned)
}

/// Authenticated admin session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Bearer token for subsequent requests
    pub access_token: String,
    /// Email of the signed-in admin
    #[serde(default)]
    pub user_email: Option<String>,
    /// When the token expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Dashboard color theme
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme
    #[default]
    Light,
    /// Dark theme
    Dark,
}

impl Theme {
    /// The other theme
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(Error::validation("theme", format!("unknown theme '{other}'"))),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn prayer_type(id: &str, name: &str, order: i32) -> PrayerType {
        PrayerType {
            id: id.to_string(),
            name: name.to_string(),
            display_order: order,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(ApprovalStatus::Pending, ApprovalStatus::Approved, true)]
    #[case(ApprovalStatus::Pending, ApprovalStatus::Denied, true)]
    #[case(ApprovalStatus::Pending, ApprovalStatus::Pending, false)]
    #[case(ApprovalStatus::Approved, ApprovalStatus::Denied, false)]
    #[case(ApprovalStatus::Denied, ApprovalStatus::Approved, false)]
    #[case(ApprovalStatus::Approved, ApprovalStatus::Pending, false)]
    fn test_status_transitions(
        #[case] from: ApprovalStatus,
        #[case] to: ApprovalStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.transition_to(to).is_ok(), allowed);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ApprovalStatus::Denied).unwrap();
        assert_eq!(json, "\"denied\"");

        let parsed: ApprovalStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(parsed, ApprovalStatus::Approved);
    }

    #[test]
    fn test_deletion_request_defaults_to_pending() {
        let json = r#"{
            "id": "r1",
            "prayer_id": "p1",
            "requested_by": "Ann",
            "reason": "dup",
            "created_at": "2024-03-01T12:00:00Z"
        }"#;

        let request: DeletionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.approval_status, ApprovalStatus::Pending);
        assert!(request.requested_email.is_none());
        assert!(request.prayer_title.is_none());
    }

    #[rstest]
    #[case("", false)]
    #[case("   \t", false)]
    #[case("  Healing ", true)]
    fn test_validate_name(#[case] input: &str, #[case] ok: bool) {
        let result = validate_name(input);
        assert_eq!(result.is_ok(), ok);
        if ok {
            assert_eq!(result.unwrap(), "Healing");
        }
    }

    #[test]
    fn test_new_prayer_type_rejects_blank_name() {
        let err = NewPrayerType::new("  ", 0, true).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: name - Name is required");
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = PrayerTypeUpdate::display_order(3);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "display_order": 3 }));
        assert!(!update.is_empty());
        assert!(PrayerTypeUpdate::default().is_empty());
    }

    #[test]
    fn test_update_apply_to() {
        let mut record = prayer_type("1", "Personal", 0);
        PrayerTypeUpdate {
            name: Some("Family".to_string()),
            display_order: None,
            is_active: Some(false),
        }
        .apply_to(&mut record);

        assert_eq!(record.name, "Family");
        assert_eq!(record.display_order, 0);
        assert!(!record.is_active);
    }

    #[test]
    fn test_sort_tolerates_duplicate_orders() {
        let mut types = vec![
            prayer_type("3", "Work", 1),
            prayer_type("1", "Personal", 0),
            prayer_type("2", "Family", 1),
        ];
        sort_for_display(&mut types);

        let names: Vec<_> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Personal", "Family", "Work"]);
    }

    #[rstest]
    #[case("admin@example.org", true)]
    #[case("  admin@example.org  ", true)]
    #[case("not-an-email", false)]
    #[case("", false)]
    fn test_validate_email(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(validate_email(input).is_ok(), ok);
    }

    #[test]
    fn test_email_settings_validate_reports_bad_address() {
        let settings = EmailSettings {
            notification_emails: vec!["a@example.org".to_string(), "broken".to_string()],
            notify_on_new_prayer: true,
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_theme_toggle_and_parse() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!("DARK".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
    }
}
