//! Denial reason draft

/// Moderator's in-progress denial reason
///
/// The only rule is that the reason is non-empty once trimmed, and only the
/// trimmed text is ever handed onward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenialDraft {
    text: String,
}

impl DenialDraft {
    /// Empty draft
    pub const fn new() -> Self {
        Self {
            text: String::new(),
        }
    }

    /// Replace the draft text
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Raw text as typed
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the draft may be submitted
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Trimmed reason, or `None` when only whitespace was typed
    pub fn submission(&self) -> Option<String> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Discard the draft
    pub fn clear(&mut self) {
        self.text.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_submission_is_trimmed() {
        let mut draft = DenialDraft::new();
        draft.set("  Trimmed reason  ");

        assert!(draft.is_valid());
        assert_eq!(draft.submission().unwrap(), "Trimmed reason");
        assert_eq!(draft.text(), "  Trimmed reason  ");
    }

    #[test]
    fn test_clear_discards_text() {
        let mut draft = DenialDraft::new();
        draft.set("half typed");
        draft.clear();

        assert_eq!(draft, DenialDraft::default());
        assert!(!draft.is_valid());
    }

    proptest! {
        #[test]
        fn prop_whitespace_is_never_submitted(reason in "[ \t\r\n]*") {
            let mut draft = DenialDraft::new();
            draft.set(reason);
            prop_assert!(!draft.is_valid());
            prop_assert!(draft.submission().is_none());
        }

        #[test]
        fn prop_submission_has_no_outer_whitespace(
            lead in "[ \t]{0,4}",
            body in "[a-z][a-z ]{0,20}[a-z]",
            trail in "[ \t\n]{0,4}",
        ) {
            let mut draft = DenialDraft::new();
            draft.set(format!("{lead}{body}{trail}"));
            prop_assert_eq!(draft.submission(), Some(body));
        }
    }
}
