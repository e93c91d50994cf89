//! Pending-request queue for one request kind

use prayer_admin_backend::{ModerationBackend, list_pending_as};
use prayer_admin_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::card::CardLayout;
use crate::moderation::{
    BackendActions, CardOutcome, CardState, ModerationActions, ModerationCard, RequestKind,
};

/// Owns one card per pending request and drops cards once resolved
pub struct ModerationQueue<K: RequestKind> {
    backend: Arc<dyn ModerationBackend>,
    actions: Arc<dyn ModerationActions>,
    cards: Vec<ModerationCard<K>>,
    error: Option<String>,
}

impl<K: RequestKind> std::fmt::Debug for ModerationQueue<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModerationQueue")
            .field("kind", &K::KIND)
            .field("cards", &self.cards)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<K: RequestKind> ModerationQueue<K> {
    /// Empty queue wired to a backend
    pub fn new(backend: Arc<dyn ModerationBackend>) -> Self {
        let actions = Arc::new(BackendActions::new(Arc::clone(&backend), K::KIND));
        Self {
            backend,
            actions,
            cards: Vec::new(),
            error: None,
        }
    }

    /// Replace the cards with the current pending requests.
    ///
    /// On failure the previous cards are kept and the error is shown.
    pub async fn load(&mut self) -> Result<usize> {
        match list_pending_as::<K>(self.backend.as_ref(), K::KIND).await {
            Ok(records) => {
                for card in &self.cards {
                    card.unmount();
                }
                self.cards = records
                    .into_iter()
                    .map(|record| ModerationCard::new(record, Arc::clone(&self.actions)))
                    .collect();
                self.error = None;
                info!(kind = %K::KIND, count = self.cards.len(), "Loaded pending requests");
                Ok(self.cards.len())
            }
            Err(err) => {
                let err = Error::from(err);
                warn!(kind = %K::KIND, error = %err, "Failed to load pending requests");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Cards in display order
    pub fn cards(&self) -> &[ModerationCard<K>] {
        &self.cards
    }

    /// Card for one request
    pub fn card(&self, id: &str) -> Option<&ModerationCard<K>> {
        self.cards.iter().find(|card| card.id() == id)
    }

    /// Number of pending cards
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether no requests are pending
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Last load failure
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Approve one request and drop its card on success
    pub async fn approve(&mut self, id: &str) -> Result<CardOutcome> {
        let card = self.require(id)?;
        let outcome = card.approve().await;
        self.settle(id, &outcome);
        Ok(outcome)
    }

    /// Open the denial form if needed, fill in `reason` and confirm
    pub async fn deny(&mut self, id: &str, reason: &str) -> Result<CardOutcome> {
        let card = self.require(id)?;
        if card.state() == CardState::Idle {
            card.toggle_deny();
        }
        card.set_reason(reason);
        let outcome = card.confirm_deny().await;
        self.settle(id, &outcome);
        Ok(outcome)
    }

    /// Render every card
    pub fn render(&self) -> Vec<CardLayout> {
        self.cards.iter().map(ModerationCard::render).collect()
    }

    fn require(&self, id: &str) -> Result<ModerationCard<K>> {
        self.card(id).cloned().ok_or_else(|| Error::NotFound {
            resource: format!("pending {} request {id}", K::KIND.table()),
        })
    }

    fn settle(&mut self, id: &str, outcome: &CardOutcome) {
        if *outcome == CardOutcome::Resolved {
            self.cards.retain(|card| {
                if card.id() == id {
                    card.unmount();
                    false
                } else {
                    true
                }
            });
            debug!(kind = %K::KIND, id, remaining = self.cards.len(), "Card removed");
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
    use chrono::{Duration, Utc};
    use prayer_admin_backend::{MockBackend, MockOperation, ModerationKind};
    use prayer_admin_core::{ApprovalStatus, UpdateDeletionRequest};
    use pretty_assertions::assert_eq;

    fn request(id: &str, age_minutes: i64) -> UpdateDeletionRequest {
        UpdateDeletionRequest {
            id: id.to_string(),
            update_id: format!("u-{id}"),
            prayer_id: None,
            update_content: Some("Thank you all".to_string()),
            requested_by: "Cy".to_string(),
            requested_email: None,
            reason: "posted twice".to_string(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
            approval_status: ApprovalStatus::Pending,
            denial_reason: None,
        }
    }

    fn queue(backend: &MockBackend) -> ModerationQueue<UpdateDeletionRequest> {
        ModerationQueue::new(Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_resolved_cards_leave_queue() {
        let backend = MockBackend::new().with_requests(
            ModerationKind::UpdateDeletion,
            &[request("a", 5), request("b", 1)],
        );
        let mut queue = queue(&backend);
        assert_eq!(queue.load().await.unwrap(), 2);

        let outcome = queue.approve("a").await.unwrap();
        assert_eq!(outcome, CardOutcome::Resolved);
        assert_eq!(queue.len(), 1);
        assert!(queue.card("a").is_none());

        let outcome = queue.deny("b", "  fine as is ").await.unwrap();
        assert_eq!(outcome, CardOutcome::Resolved);
        assert!(queue.is_empty());
        assert_eq!(
            backend.request_status(ModerationKind::UpdateDeletion, "b"),
            Some(ApprovalStatus::Denied)
        );
    }

    #[tokio::test]
    async fn test_cards_load_newest_first() {
        let backend = MockBackend::new().with_requests(
            ModerationKind::UpdateDeletion,
            &[request("older", 90), request("newer", 2)],
        );
        let mut queue = queue(&backend);
        queue.load().await.unwrap();

        let ids: Vec<_> = queue.cards().iter().map(ModerationCard::id).collect();
        assert_eq!(ids, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_failed_action_keeps_card() {
        let backend =
            MockBackend::new().with_requests(ModerationKind::UpdateDeletion, &[request("a", 5)]);
        backend.fail(MockOperation::Approve, "offline");
        let mut queue = queue(&backend);
        queue.load().await.unwrap();

        let outcome = queue.approve("a").await.unwrap();

        assert!(matches!(outcome, CardOutcome::Failed(_)));
        assert_eq!(queue.len(), 1);
        assert!(queue.render()[0].error.is_some());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_cards() {
        let backend =
            MockBackend::new().with_requests(ModerationKind::UpdateDeletion, &[request("a", 5)]);
        let mut queue = queue(&backend);
        queue.load().await.unwrap();

        backend.fail(MockOperation::ListPending, "offline");
        assert!(queue.load().await.is_err());

        assert_eq!(queue.len(), 1);
        assert!(queue.error().unwrap().contains("offline"));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let backend = MockBackend::new();
        let mut queue = queue(&backend);
        queue.load().await.unwrap();

        let err = queue.approve("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
