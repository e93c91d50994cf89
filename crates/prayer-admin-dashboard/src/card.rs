//! Card presentation contract
//!
//! Every moderation card renders into the same slot layout: a title with an
//! optional subtitle, a block of content lines, a block of meta lines, the
//! requester's reason, an error slot, and an action bar. An optional inline
//! form sits between the body and the action bar.

use serde::Serialize;
use std::fmt::Write as _;

/// A button in a card's action bar or inline form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardAction {
    /// Label shown when idle
    pub label: String,
    /// Whether the button accepts clicks
    pub enabled: bool,
    /// Whether the operation behind the button is in flight
    pub busy: bool,
    /// Label shown while busy
    pub busy_label: Option<String>,
}

impl CardAction {
    /// An enabled, idle button
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            busy: false,
            busy_label: None,
        }
    }

    /// Set the label shown while busy
    #[must_use]
    pub fn with_busy_label(mut self, label: impl Into<String>) -> Self {
        self.busy_label = Some(label.into());
        self
    }

    /// Set whether the button accepts clicks
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Mark the button busy; a busy button never accepts clicks
    #[must_use]
    pub const fn busy(mut self, busy: bool) -> Self {
        self.busy = busy;
        if busy {
            self.enabled = false;
        }
        self
    }

    /// Label to display right now
    pub fn display_label(&self) -> &str {
        match (&self.busy_label, self.busy) {
            (Some(label), true) => label,
            _ => &self.label,
        }
    }
}

/// Inline form rendered inside a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineForm {
    /// Field label
    pub field_label: String,
    /// Current field value
    pub value: String,
    /// Form buttons
    pub actions: Vec<CardAction>,
}

/// Slot layout shared by all moderation cards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardLayout {
    /// Headline
    pub title: String,
    /// Secondary headline
    pub subtitle: Option<String>,
    /// Body lines
    pub content: Vec<String>,
    /// Small print: requester, dates
    pub meta: Vec<String>,
    /// Reason given by the requester
    pub reason: Option<String>,
    /// Last failure, if any
    pub error: Option<String>,
    /// Inline form, when open
    pub form: Option<InlineForm>,
    /// Action bar
    pub actions: Vec<CardAction>,
}

impl CardLayout {
    /// Start a layout with a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the subtitle
    #[must_use]
    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Append a content line
    #[must_use]
    pub fn content(mut self, line: impl Into<String>) -> Self {
        self.content.push(line.into());
        self
    }

    /// Append a meta line
    #[must_use]
    pub fn meta(mut self, line: impl Into<String>) -> Self {
        self.meta.push(line.into());
        self
    }

    /// Set the reason
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Find an action by label, in the bar or the form
    pub fn action(&self, label: &str) -> Option<&CardAction> {
        self.actions
            .iter()
            .chain(self.form.iter().flat_map(|form| form.actions.iter()))
            .find(|action| action.label == label)
    }

    /// Plain-text rendering for terminals
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        if let Some(subtitle) = &self.subtitle {
            let _ = writeln!(out, "  {subtitle}");
        }
        for line in &self.content {
            let _ = writeln!(out, "  {line}");
        }
        if let Some(reason) = &self.reason {
            let _ = writeln!(out, "  Reason: {reason}");
        }
        for line in &self.meta {
            let _ = writeln!(out, "  {line}");
        }
        if let Some(error) = &self.error {
            let _ = writeln!(out, "  ! {error}");
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_busy_action_is_disabled_and_relabelled() {
        let action = CardAction::new("Approve")
            .with_busy_label("Processing...")
            .busy(true);

        assert!(!action.enabled);
        assert_eq!(action.display_label(), "Processing...");
        assert_eq!(CardAction::new("Deny").display_label(), "Deny");
    }

    #[test]
    fn test_text_rendering_includes_slots() {
        let mut layout = CardLayout::new("Delete prayer")
            .subtitle("Healing for my aunt")
            .content("Prayer p1")
            .meta("Requested by Ann")
            .reason("dup");
        layout.error = Some("Backend error: offline".to_string());

        let text = layout.to_text();
        assert!(text.starts_with("Delete prayer\n"));
        assert!(text.contains("  Reason: dup\n"));
        assert!(text.contains("  ! Backend error: offline\n"));
    }

    #[test]
    fn test_action_lookup_searches_form() {
        let mut layout = CardLayout::new("t");
        layout.actions.push(CardAction::new("Approve"));
        layout.form = Some(InlineForm {
            field_label: "Reason".to_string(),
            value: String::new(),
            actions: vec![CardAction::new("Confirm Denial").enabled(false)],
        });

        assert!(layout.action("Approve").unwrap().enabled);
        assert!(!layout.action("Confirm Denial").unwrap().enabled);
        assert!(layout.action("Missing").is_none());
    }
}
