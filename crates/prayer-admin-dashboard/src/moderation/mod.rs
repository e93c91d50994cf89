//! Moderation request cards
//!
//! A [`ModerationCard`] wraps one pending request and drives the approve and
//! deny actions through a [`ModerationActions`] collaborator. The card owns
//! only local UI state:
//!
//! ```text
//!            Deny / Cancel
//!   Idle  <----------------->  DenyFormOpen
//!    |                              |
//!    | Approve          Confirm (non-empty reason)
//!    v                              v
//!    +-------->  Processing  <------+
//!                    |
//!        failure: back to the state it came from
//!        success: Resolved, parent drops the card
//! ```
//!
//! Clones of a card share state, so a second click arriving from any clone
//! while an operation is in flight is ignored.

pub mod kinds;

use async_trait::async_trait;
use parking_lot::Mutex;
use prayer_admin_backend::{ModerationBackend, ModerationKind};
use prayer_admin_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::card::{CardAction, CardLayout, InlineForm};
use crate::denial::DenialDraft;

pub use kinds::RequestKind;

/// Label of the approve button
pub const APPROVE_LABEL: &str = "Approve";
/// Label of the deny toggle
pub const DENY_LABEL: &str = "Deny";
/// Label of the deny confirmation
pub const CONFIRM_DENY_LABEL: &str = "Confirm Denial";
/// Label of the form cancel button
pub const CANCEL_LABEL: &str = "Cancel";
/// Busy label on the action bar
pub const PROCESSING_LABEL: &str = "Processing...";

/// Approve and deny operations a card delegates to
#[async_trait]
pub trait ModerationActions: Send + Sync {
    /// Approve the request
    async fn approve(&self, id: &str) -> Result<()>;

    /// Deny the request; `reason` is already trimmed and non-empty
    async fn deny(&self, id: &str, reason: &str) -> Result<()>;
}

/// [`ModerationActions`] for one request kind, backed by a [`ModerationBackend`]
#[derive(Clone)]
pub struct BackendActions {
    backend: Arc<dyn ModerationBackend>,
    kind: ModerationKind,
}

impl BackendActions {
    /// Bind a backend to a request kind
    pub fn new(backend: Arc<dyn ModerationBackend>, kind: ModerationKind) -> Self {
        Self { backend, kind }
    }
}

impl std::fmt::Debug for BackendActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendActions")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ModerationActions for BackendActions {
    async fn approve(&self, id: &str) -> Result<()> {
        self.backend
            .approve(self.kind, id)
            .await
            .map_err(Error::from)
    }

    async fn deny(&self, id: &str, reason: &str) -> Result<()> {
        self.backend
            .deny(self.kind, id, reason)
            .await
            .map_err(Error::from)
    }
}

/// Local state of one card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    /// Both actions available
    Idle,
    /// Denial form visible
    DenyFormOpen,
    /// An action is in flight
    Processing {
        /// Whether the in-flight action is a denial
        denying: bool,
    },
}

impl CardState {
    /// Whether an action is in flight
    pub const fn is_processing(self) -> bool {
        matches!(self, Self::Processing { .. })
    }
}

/// Result of a user action on a card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    /// The request was decided; the parent should drop the card
    Resolved,
    /// Nothing happened: wrong state, busy, or invalid reason
    Ignored,
    /// The operation failed; the card is interactive again
    Failed(String),
}

#[derive(Debug)]
struct CardInner {
    state: CardState,
    draft: DenialDraft,
    error: Option<String>,
    mounted: bool,
}

/// State machine for one pending request
pub struct ModerationCard<K: RequestKind> {
    request: Arc<K>,
    actions: Arc<dyn ModerationActions>,
    inner: Arc<Mutex<CardInner>>,
}

impl<K: RequestKind> Clone for ModerationCard<K> {
    fn clone(&self) -> Self {
        Self {
            request: Arc::clone(&self.request),
            actions: Arc::clone(&self.actions),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: RequestKind> std::fmt::Debug for ModerationCard<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModerationCard")
            .field("kind", &K::KIND)
            .field("id", &self.request.id())
            .field("state", &self.inner.lock().state)
            .finish_non_exhaustive()
    }
}

impl<K: RequestKind> ModerationCard<K> {
    /// Create an idle card for one request
    pub fn new(request: K, actions: Arc<dyn ModerationActions>) -> Self {
        Self {
            request: Arc::new(request),
            actions,
            inner: Arc::new(Mutex::new(CardInner {
                state: CardState::Idle,
                draft: DenialDraft::new(),
                error: None,
                mounted: true,
            })),
        }
    }

    /// The request this card shows
    pub fn request(&self) -> &K {
        &self.request
    }

    /// Request identifier
    pub fn id(&self) -> &str {
        self.request.id()
    }

    /// Current state
    pub fn state(&self) -> CardState {
        self.inner.lock().state
    }

    /// Raw denial draft text
    pub fn reason(&self) -> String {
        self.inner.lock().draft.text().to_string()
    }

    /// Last failure shown on the card
    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    /// Whether the deny confirmation accepts clicks
    pub fn can_confirm(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == CardState::DenyFormOpen && inner.draft.is_valid()
    }

    /// Whether the denial form is visible
    pub fn is_form_open(&self) -> bool {
        matches!(
            self.inner.lock().state,
            CardState::DenyFormOpen | CardState::Processing { denying: true }
        )
    }

    /// Approve the request; only from [`CardState::Idle`]
    pub async fn approve(&self) -> CardOutcome {
        {
            let mut inner = self.inner.lock();
            if inner.state != CardState::Idle {
                debug!(id = self.id(), state = ?inner.state, "Approve ignored");
                return CardOutcome::Ignored;
            }
            inner.state = CardState::Processing { denying: false };
            inner.error = None;
        }

        let result = self.actions.approve(self.id()).await;
        self.finish(result, false)
    }

    /// Open the denial form, or close it and discard the draft
    pub fn toggle_deny(&self) -> CardState {
        let mut inner = self.inner.lock();
        let current = inner.state;
        inner.state = match current {
            CardState::Idle => CardState::DenyFormOpen,
            CardState::DenyFormOpen => {
                inner.draft.clear();
                CardState::Idle
            }
            busy @ CardState::Processing { .. } => busy,
        };
        inner.state
    }

    /// Close the denial form and discard the draft
    pub fn cancel_deny(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CardState::DenyFormOpen {
            inner.draft.clear();
            inner.state = CardState::Idle;
        }
    }

    /// Replace the denial draft; ignored unless the form is open
    pub fn set_reason(&self, text: impl Into<String>) {
        let mut inner = self.inner.lock();
        if inner.state == CardState::DenyFormOpen {
            inner.draft.set(text);
        }
    }

    /// Deny with the trimmed draft; a blank draft is a no-op
    pub async fn confirm_deny(&self) -> CardOutcome {
        let reason = {
            let mut inner = self.inner.lock();
            if inner.state != CardState::DenyFormOpen {
                return CardOutcome::Ignored;
            }
            let Some(reason) = inner.draft.submission() else {
                return CardOutcome::Ignored;
            };
            inner.state = CardState::Processing { denying: true };
            inner.error = None;
            reason
        };

        let result = self.actions.deny(self.id(), &reason).await;
        self.finish(result, true)
    }

    /// Detach the card; later completions no longer touch its state
    pub fn unmount(&self) {
        self.inner.lock().mounted = false;
    }

    fn finish(&self, result: Result<()>, denying: bool) -> CardOutcome {
        let mut inner = self.inner.lock();
        let mounted = inner.mounted;

        match result {
            Ok(()) => {
                info!(kind = %K::KIND, id = self.id(), denying, "Request resolved");
                if mounted {
                    inner.state = CardState::Idle;
                    inner.draft.clear();
                }
                CardOutcome::Resolved
            }
            Err(err) => {
                let message = err.to_string();
                warn!(
                    kind = %K::KIND,
                    id = self.id(),
                    denying,
                    error = %message,
                    "Moderation action failed"
                );
                // The draft survives so reopening the form restores it
                if mounted {
                    inner.state = CardState::Idle;
                    inner.error = Some(message.clone());
                }
                CardOutcome::Failed(message)
            }
        }
    }

    /// Render into the shared card layout
    pub fn render(&self) -> CardLayout {
        let inner = self.inner.lock();
        let processing = inner.state.is_processing();
        let form_open = matches!(
            inner.state,
            CardState::DenyFormOpen | CardState::Processing { denying: true }
        );

        let mut layout = self.request.layout();
        layout.error.clone_from(&inner.error);

        if form_open {
            layout.form = Some(InlineForm {
                field_label: "Reason for denial".to_string(),
                value: inner.draft.text().to_string(),
                actions: vec![
                    CardAction::new(CONFIRM_DENY_LABEL)
                        .with_busy_label("Denying...")
                        .enabled(inner.draft.is_valid())
                        .busy(processing),
                    CardAction::new(CANCEL_LABEL).enabled(!processing),
                ],
            });
        }

        layout.actions = vec![
            CardAction::new(APPROVE_LABEL)
                .with_busy_label(PROCESSING_LABEL)
                .enabled(inner.state == CardState::Idle)
                .busy(inner.state == CardState::Processing { denying: false }),
            CardAction::new(DENY_LABEL).enabled(!processing),
        ];

        layout
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
    use chrono::Utc;
    use prayer_admin_core::{ApprovalStatus, DeletionRequest};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Approve(String),
        Deny(String, String),
    }

    /// Records calls; optionally fails or waits for a release signal
    #[derive(Default)]
    struct RecordingActions {
        calls: Mutex<Vec<Call>>,
        fail_with: Option<String>,
        gate: Option<Arc<Notify>>,
    }

    impl RecordingActions {
        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        async fn finish(&self) -> Result<()> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.fail_with {
                Some(message) => Err(Error::Backend(message.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ModerationActions for RecordingActions {
        async fn approve(&self, id: &str) -> Result<()> {
            self.calls.lock().push(Call::Approve(id.to_string()));
            self.finish().await
        }

        async fn deny(&self, id: &str, reason: &str) -> Result<()> {
            self.calls
                .lock()
                .push(Call::Deny(id.to_string(), reason.to_string()));
            self.finish().await
        }
    }

    fn request(id: &str) -> DeletionRequest {
        DeletionRequest {
            id: id.to_string(),
            prayer_id: "p1".to_string(),
            prayer_title: None,
            requested_by: "Ann".to_string(),
            requested_email: None,
            reason: "dup".to_string(),
            created_at: Utc::now(),
            approval_status: ApprovalStatus::Pending,
            denial_reason: None,
        }
    }

    fn card(actions: &Arc<RecordingActions>) -> ModerationCard<DeletionRequest> {
        let actions: Arc<dyn ModerationActions> = actions.clone();
        ModerationCard::new(request("r1"), actions)
    }

    #[tokio::test]
    async fn test_approve_calls_collaborator_with_id() {
        let actions = Arc::new(RecordingActions::default());
        let card = card(&actions);

        assert_eq!(card.approve().await, CardOutcome::Resolved);
        assert_eq!(actions.calls(), vec![Call::Approve("r1".to_string())]);
    }

    #[tokio::test]
    async fn test_deny_with_typed_reason() {
        let actions = Arc::new(RecordingActions::default());
        let card = card(&actions);

        card.toggle_deny();
        card.set_reason("not valid");
        assert_eq!(card.confirm_deny().await, CardOutcome::Resolved);

        assert_eq!(
            actions.calls(),
            vec![Call::Deny("r1".to_string(), "not valid".to_string())]
        );
        assert_eq!(card.state(), CardState::Idle);
        assert_eq!(card.reason(), "");
    }

    #[tokio::test]
    async fn test_deny_passes_trimmed_reason() {
        let actions = Arc::new(RecordingActions::default());
        let card = card(&actions);

        card.toggle_deny();
        card.set_reason("  Trimmed reason  ");
        card.confirm_deny().await;

        assert_eq!(
            actions.calls(),
            vec![Call::Deny("r1".to_string(), "Trimmed reason".to_string())]
        );
    }

    #[test]
    fn test_deny_toggle_twice_hides_form_and_clears_draft() {
        let actions = Arc::new(RecordingActions::default());
        let card = card(&actions);

        assert_eq!(card.toggle_deny(), CardState::DenyFormOpen);
        card.set_reason("half typed");
        assert_eq!(card.toggle_deny(), CardState::Idle);

        assert!(!card.is_form_open());
        assert_eq!(card.reason(), "");
        assert!(card.render().form.is_none());
    }

    #[test]
    fn test_cancel_discards_draft() {
        let actions = Arc::new(RecordingActions::default());
        let card = card(&actions);

        card.toggle_deny();
        card.set_reason("mid-typing");
        card.cancel_deny();

        assert_eq!(card.state(), CardState::Idle);
        card.toggle_deny();
        assert_eq!(card.reason(), "");
    }

    #[tokio::test]
    async fn test_action_disabled_until_approve_resolves() {
        let gate = Arc::new(Notify::new());
        let actions = Arc::new(RecordingActions::gated(gate.clone()));
        let card = card(&actions);

        let task = tokio::spawn({
            let card = card.clone();
            async move { card.approve().await }
        });
        while !card.state().is_processing() {
            tokio::task::yield_now().await;
        }

        let layout = card.render();
        let approve = layout.action(APPROVE_LABEL).unwrap();
        assert!(!approve.enabled);
        assert_eq!(approve.display_label(), PROCESSING_LABEL);
        assert!(!layout.action(DENY_LABEL).unwrap().enabled);

        assert_eq!(card.approve().await, CardOutcome::Ignored);
        assert_eq!(card.toggle_deny(), CardState::Processing { denying: false });

        gate.notify_one();
        assert_eq!(task.await.unwrap(), CardOutcome::Resolved);
        assert_eq!(actions.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_approve_returns_to_idle_with_error() {
        let actions = Arc::new(RecordingActions::failing("offline"));
        let card = card(&actions);

        let outcome = card.approve().await;

        assert_eq!(outcome, CardOutcome::Failed("Backend error: offline".to_string()));
        assert_eq!(card.state(), CardState::Idle);
        assert_eq!(card.render().error.as_deref(), Some("Backend error: offline"));
        assert!(card.render().action(APPROVE_LABEL).unwrap().enabled);
    }

    #[tokio::test]
    async fn test_failed_deny_returns_to_idle_and_keeps_draft() {
        let actions = Arc::new(RecordingActions::failing("offline"));
        let card = card(&actions);

        card.toggle_deny();
        card.set_reason("not valid");
        let outcome = card.confirm_deny().await;

        assert_eq!(outcome, CardOutcome::Failed("Backend error: offline".to_string()));
        assert_eq!(card.state(), CardState::Idle);
        let layout = card.render();
        assert!(layout.form.is_none());
        assert!(layout.action(APPROVE_LABEL).unwrap().enabled);
        assert!(layout.action(DENY_LABEL).unwrap().enabled);
        assert_eq!(layout.error.as_deref(), Some("Backend error: offline"));

        assert_eq!(card.toggle_deny(), CardState::DenyFormOpen);
        assert_eq!(card.reason(), "not valid");
        assert!(card.can_confirm());
    }

    #[tokio::test]
    async fn test_late_completion_after_unmount_is_dropped() {
        let gate = Arc::new(Notify::new());
        let actions = Arc::new(RecordingActions::gated(gate.clone()));
        let card = card(&actions);

        let task = tokio::spawn({
            let card = card.clone();
            async move { card.approve().await }
        });
        while !card.state().is_processing() {
            tokio::task::yield_now().await;
        }

        card.unmount();
        gate.notify_one();
        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome, CardOutcome::Resolved);
        assert!(card.state().is_processing());
    }

    #[tokio::test]
    async fn test_backend_actions_decide_mock_request() {
        let backend = prayer_admin_backend::MockBackend::new()
            .with_requests(ModerationKind::PrayerDeletion, &[request("r1")]);
        let actions: Arc<dyn ModerationActions> = Arc::new(BackendActions::new(
            Arc::new(backend.clone()),
            ModerationKind::PrayerDeletion,
        ));
        let card = ModerationCard::new(request("r1"), actions);

        card.toggle_deny();
        card.set_reason("not valid");
        assert_eq!(card.confirm_deny().await, CardOutcome::Resolved);
        assert_eq!(
            backend.request_status(ModerationKind::PrayerDeletion, "r1"),
            Some(ApprovalStatus::Denied)
        );
    }

    proptest! {
        #[test]
        fn prop_whitespace_reason_never_reaches_deny(reason in "[ \t\r\n]{0,12}") {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let actions = Arc::new(RecordingActions::default());
            let card = card(&actions);

            card.toggle_deny();
            card.set_reason(reason);
            prop_assert!(!card.can_confirm());
            prop_assert!(!card.render().action(CONFIRM_DENY_LABEL).unwrap().enabled);

            let outcome = runtime.block_on(card.confirm_deny());
            prop_assert_eq!(outcome, CardOutcome::Ignored);
            prop_assert!(actions.calls().is_empty());
            prop_assert_eq!(card.state(), CardState::DenyFormOpen);
        }
    }
}
