//! Prayer-type list editor
//!
//! Reorder swaps `display_order` with the neighbour in the rendered list
//! using two independent updates. They are sent one after the other with no
//! transaction and no rollback: if the second write fails the swap is left
//! half-applied, the manager reports that as an error and re-fetches so the
//! list shows what the backend actually holds. Duplicate `display_order`
//! values are tolerated and never renumbered.

use prayer_admin_backend::PrayerTypeStore;
use prayer_admin_core::{
    Error, NewPrayerType, PrayerType, PrayerTypeUpdate, Result,
    types::{sort_for_display, validate_name},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::cache::PrayerTypeCache;

/// Blocking yes/no question asked before destructive actions
pub trait ConfirmPrompt: Send + Sync {
    /// Ask the question; `true` means go ahead
    fn confirm(&self, message: &str) -> bool;
}

/// Create/edit form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerTypeForm {
    /// Name as typed
    pub name: String,
    /// Explicit sort key; new records default to the end of the list
    pub display_order: Option<i32>,
    /// Active flag
    pub is_active: bool,
}

impl Default for PrayerTypeForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_order: None,
            is_active: true,
        }
    }
}

/// Reorder direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Towards the start of the list
    Up,
    /// Towards the end of the list
    Down,
}

/// One rendered row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerTypeRow {
    /// Record identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Sort key
    pub display_order: i32,
    /// Active flag
    pub is_active: bool,
    /// Whether "move up" does anything
    pub can_move_up: bool,
    /// Whether "move down" does anything
    pub can_move_down: bool,
    /// Whether the row is being edited
    pub editing: bool,
}

type ChangeCallback = Box<dyn Fn() + Send + Sync>;

/// View-model for managing prayer types
pub struct PrayerTypeManager {
    store: Arc<dyn PrayerTypeStore>,
    cache: PrayerTypeCache,
    confirm: Arc<dyn ConfirmPrompt>,
    types: Vec<PrayerType>,
    form: PrayerTypeForm,
    editing: Option<String>,
    error: Option<String>,
    success: Option<String>,
    on_change: Option<ChangeCallback>,
}

impl std::fmt::Debug for PrayerTypeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrayerTypeManager")
            .field("types", &self.types.len())
            .field("editing", &self.editing)
            .field("error", &self.error)
            .field("success", &self.success)
            .finish_non_exhaustive()
    }
}

impl PrayerTypeManager {
    /// Create a manager; nothing is fetched until [`mount`](Self::mount)
    pub fn new(
        store: Arc<dyn PrayerTypeStore>,
        cache: PrayerTypeCache,
        confirm: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        Self {
            store,
            cache,
            confirm,
            types: Vec::new(),
            form: PrayerTypeForm::default(),
            editing: None,
            error: None,
            success: None,
            on_change: None,
        }
    }

    /// Callback run after every successful mutation
    #[must_use]
    pub fn on_change(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Show cached data if any, otherwise fetch
    pub async fn mount(&mut self) -> Result<()> {
        self.fetch(false).await
    }

    /// Load the list; `force` bypasses the cache
    pub async fn fetch(&mut self, force: bool) -> Result<()> {
        if !force {
            if let Some(cached) = self.cache.get() {
                debug!(count = cached.len(), "Using cached prayer types");
                self.types = cached;
                return Ok(());
            }
        }

        let listed = self.store.list().await;
        match listed {
            Ok(mut types) => {
                sort_for_display(&mut types);
                self.cache.store(types.clone());
                self.types = types;
                debug!(count = self.types.len(), "Fetched prayer types");
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Records in display order
    pub fn types(&self) -> &[PrayerType] {
        &self.types
    }

    /// Current form
    pub const fn form(&self) -> &PrayerTypeForm {
        &self.form
    }

    /// Mutable form for input handling
    pub fn form_mut(&mut self) -> &mut PrayerTypeForm {
        &mut self.form
    }

    /// Id of the record being edited
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Visible error message
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Visible success message
    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }

    /// Dismiss both messages
    pub fn clear_messages(&mut self) {
        self.error = None;
        self.success = None;
    }

    /// Load a record into the form for editing
    pub fn start_edit(&mut self, id: &str) -> Result<()> {
        let record = self.find(id)?;
        self.form = PrayerTypeForm {
            name: record.name.clone(),
            display_order: Some(record.display_order),
            is_active: record.is_active,
        };
        self.editing = Some(id.to_string());
        Ok(())
    }

    /// Leave edit mode and reset the form
    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.form = PrayerTypeForm::default();
    }

    /// Create or update from the form, depending on edit mode
    pub async fn submit(&mut self) -> Result<()> {
        match self.editing.clone() {
            Some(id) => self.update(&id).await,
            None => self.create().await,
        }
    }

    async fn create(&mut self) -> Result<()> {
        let display_order = match self.form.display_order {
            Some(order) => order,
            None => i32::try_from(self.types.len()).unwrap_or(i32::MAX),
        };
        let record = NewPrayerType::new(&self.form.name, display_order, self.form.is_active)
            .map_err(|err| self.fail(err))?;

        let created = self
            .store
            .create(&record)
            .await
            .map_err(|err| self.fail(err.into()))?;

        info!(id = %created.id, name = %created.name, "Prayer type created");
        self.form = PrayerTypeForm::default();
        self.after_mutation(format!("Added \"{}\"", created.name)).await
    }

    async fn update(&mut self, id: &str) -> Result<()> {
        let name = validate_name(&self.form.name).map_err(|err| self.fail(err))?;
        let changes = PrayerTypeUpdate {
            name: Some(name.clone()),
            display_order: self.form.display_order,
            is_active: Some(self.form.is_active),
        };

        self.store
            .update(id, &changes)
            .await
            .map_err(|err| self.fail(err.into()))?;

        info!(id, %name, "Prayer type updated");
        self.cancel_edit();
        self.after_mutation(format!("Updated \"{name}\"")).await
    }

    /// Delete after confirmation. Returns `false` when the user declined.
    pub async fn delete(&mut self, id: &str) -> Result<bool> {
        let name = self.find(id)?.name.clone();
        if !self
            .confirm
            .confirm(&format!("Delete prayer type \"{name}\"?"))
        {
            debug!(id, "Delete declined");
            return Ok(false);
        }

        self.store
            .delete(id)
            .await
            .map_err(|err| self.fail(err.into()))?;

        info!(id, %name, "Prayer type deleted");
        if self.editing.as_deref() == Some(id) {
            self.cancel_edit();
        }
        self.after_mutation(format!("Deleted \"{name}\"")).await?;
        Ok(true)
    }

    /// Flip the active flag
    pub async fn toggle_active(&mut self, id: &str) -> Result<()> {
        let record = self.find(id)?;
        let (name, active) = (record.name.clone(), !record.is_active);

        self.store
            .update(id, &PrayerTypeUpdate::active(active))
            .await
            .map_err(|err| self.fail(err.into()))?;

        let state = if active { "Activated" } else { "Deactivated" };
        self.after_mutation(format!("{state} \"{name}\"")).await
    }

    /// Swap with the previous record
    pub async fn move_up(&mut self, id: &str) -> Result<bool> {
        self.reorder(id, MoveDirection::Up).await
    }

    /// Swap with the next record
    pub async fn move_down(&mut self, id: &str) -> Result<bool> {
        self.reorder(id, MoveDirection::Down).await
    }

    /// Swap `display_order` with the neighbour in `direction`.
    ///
    /// Returns `false` without writing when there is no neighbour.
    pub async fn reorder(&mut self, id: &str, direction: MoveDirection) -> Result<bool> {
        let index = self.position(id)?;
        let neighbour_index = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => index.checked_add(1).filter(|&i| i < self.types.len()),
        };
        let (Some(target), Some(neighbour)) = (
            self.types.get(index).cloned(),
            neighbour_index.and_then(|i| self.types.get(i)).cloned(),
        ) else {
            debug!(id, ?direction, "Move ignored at list boundary");
            return Ok(false);
        };

        self.store
            .update(&target.id, &PrayerTypeUpdate::display_order(neighbour.display_order))
            .await
            .map_err(|err| self.fail(err.into()))?;

        if let Err(err) = self
            .store
            .update(&neighbour.id, &PrayerTypeUpdate::display_order(target.display_order))
            .await
        {
            warn!(
                target = %target.id,
                neighbour = %neighbour.id,
                error = %err,
                "Reorder partially applied"
            );
            self.cache.invalidate();
            let _ = self.fetch(true).await;
            return Err(self.fail(Error::Backend(format!(
                "Reorder partially applied: \"{}\" now has order {} but \"{}\" kept {}: {err}",
                target.name, neighbour.display_order, neighbour.name, neighbour.display_order
            ))));
        }

        self.after_mutation(format!("Moved \"{}\"", target.name))
            .await?;
        Ok(true)
    }

    /// Rows for rendering
    pub fn render(&self) -> Vec<PrayerTypeRow> {
        let last = self.types.len().saturating_sub(1);
        self.types
            .iter()
            .enumerate()
            .map(|(index, record)| PrayerTypeRow {
                id: record.id.clone(),
                name: record.name.clone(),
                display_order: record.display_order,
                is_active: record.is_active,
                can_move_up: index > 0,
                can_move_down: index < last,
                editing: self.editing.as_deref() == Some(record.id.as_str()),
            })
            .collect()
    }

    fn find(&mut self, id: &str) -> Result<&PrayerType> {
        let index = self.position(id)?;
        self.types.get(index).ok_or_else(|| Error::NotFound {
            resource: format!("prayer type {id}"),
        })
    }

    fn position(&mut self, id: &str) -> Result<usize> {
        match self.types.iter().position(|record| record.id == id) {
            Some(index) => Ok(index),
            None => Err(self.fail(Error::NotFound {
                resource: format!("prayer type {id}"),
            })),
        }
    }

    /// Invalidate, re-fetch, report success
    async fn after_mutation(&mut self, message: String) -> Result<()> {
        self.cache.invalidate();
        self.fetch(true).await?;
        self.error = None;
        self.success = Some(message);
        if let Some(callback) = &self.on_change {
            callback();
        }
        Ok(())
    }

    /// Record a failure as the visible error
    fn fail(&mut self, err: Error) -> Error {
        let message = match &err {
            Error::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };
        if err.is_validation() {
            debug!(error = %message, "Prayer type form rejected");
        } else {
            warn!(error = %message, "Prayer type operation failed");
        }
        self.error = Some(message);
        self.success = None;
        err
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
    use prayer_admin_backend::{MockBackend, MockCall, MockOperation};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Answer {
        yes: bool,
        asked: AtomicUsize,
    }

    impl Answer {
        fn new(yes: bool) -> Arc<Self> {
            Arc::new(Self {
                yes,
                asked: AtomicUsize::new(0),
            })
        }
    }

    impl ConfirmPrompt for Answer {
        fn confirm(&self, _message: &str) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.yes
        }
    }

    fn prayer_type(id: &str, name: &str, order: i32) -> PrayerType {
        PrayerType {
            id: id.to_string(),
            name: name.to_string(),
            display_order: order,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn seeded() -> MockBackend {
        MockBackend::new().with_prayer_types(vec![
            prayer_type("1", "Personal", 0),
            prayer_type("2", "Family", 1),
        ])
    }

    fn manager(backend: &MockBackend, confirm: Arc<Answer>) -> PrayerTypeManager {
        PrayerTypeManager::new(Arc::new(backend.clone()), PrayerTypeCache::new(), confirm)
    }

    fn names(manager: &PrayerTypeManager) -> Vec<&str> {
        manager.types().iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_move_down_swaps_orders_then_refetches() {
        let backend = seeded();
        let mut manager = manager(&backend, Answer::new(true));
        manager.mount().await.unwrap();
        backend.clear_calls();

        assert!(manager.move_down("1").await.unwrap());

        assert_eq!(
            backend.calls(),
            vec![
                MockCall::UpdatePrayerType("1".to_string(), PrayerTypeUpdate::display_order(1)),
                MockCall::UpdatePrayerType("2".to_string(), PrayerTypeUpdate::display_order(0)),
                MockCall::ListPrayerTypes,
            ]
        );
        assert_eq!(names(&manager), vec!["Family", "Personal"]);
        assert!(manager.error().is_none());
    }

    #[tokio::test]
    async fn test_reorder_at_boundaries_is_noop() {
        let backend = seeded();
        let mut manager = manager(&backend, Answer::new(true));
        manager.mount().await.unwrap();

        assert!(!manager.move_up("1").await.unwrap());
        assert!(!manager.move_down("2").await.unwrap());
        assert!(backend.writes().is_empty());

        let rows = manager.render();
        assert!(!rows[0].can_move_up);
        assert!(!rows[1].can_move_down);
    }

    #[tokio::test]
    async fn test_partial_reorder_is_reported() {
        let backend = seeded();
        backend.fail_after(MockOperation::UpdatePrayerType, 1, "conflict");
        let mut manager = manager(&backend, Answer::new(true));
        manager.mount().await.unwrap();

        let err = manager.move_down("1").await.unwrap_err();

        assert!(err.to_string().contains("partially applied"));
        assert!(manager.error().unwrap().contains("\"Personal\""));
        // First write landed, so both records now share order 1.
        let orders: Vec<_> = manager.types().iter().map(|t| t.display_order).collect();
        assert_eq!(orders, vec![1, 1]);
    }

    #[tokio::test]
    async fn test_create_with_blank_name_writes_nothing() {
        let backend = seeded();
        let mut manager = manager(&backend, Answer::new(true));
        manager.mount().await.unwrap();

        manager.form_mut().name = "   ".to_string();
        assert!(manager.submit().await.is_err());

        assert_eq!(manager.error(), Some("Name is required"));
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_create_defaults_to_end_of_list() {
        let backend = seeded();
        let changes = Arc::new(AtomicUsize::new(0));
        let mut manager = manager(&backend, Answer::new(true)).on_change({
            let changes = changes.clone();
            move || {
                changes.fetch_add(1, Ordering::SeqCst);
            }
        });
        manager.mount().await.unwrap();

        manager.form_mut().name = "  Healing ".to_string();
        manager.submit().await.unwrap();

        let created = manager.types().last().unwrap();
        assert_eq!(created.name, "Healing");
        assert_eq!(created.display_order, 2);
        assert_eq!(manager.form(), &PrayerTypeForm::default());
        assert_eq!(manager.success(), Some("Added \"Healing\""));
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_clears_edit_state() {
        let backend = seeded();
        let mut manager = manager(&backend, Answer::new(true));
        manager.mount().await.unwrap();

        manager.start_edit("2").unwrap();
        assert_eq!(manager.form().name, "Family");
        manager.form_mut().name = "Family & Friends".to_string();
        manager.submit().await.unwrap();

        assert!(manager.editing().is_none());
        assert_eq!(names(&manager), vec!["Personal", "Family & Friends"]);
    }

    #[tokio::test]
    async fn test_declined_delete_issues_no_write() {
        let backend = seeded();
        let confirm = Answer::new(false);
        let mut manager = manager(&backend, confirm.clone());
        manager.mount().await.unwrap();

        assert!(!manager.delete("1").await.unwrap());

        assert_eq!(confirm.asked.load(Ordering::SeqCst), 1);
        assert!(backend.writes().is_empty());
        assert_eq!(manager.types().len(), 2);
    }

    #[tokio::test]
    async fn test_confirmed_delete_removes_record() {
        let backend = seeded();
        let mut manager = manager(&backend, Answer::new(true));
        manager.mount().await.unwrap();

        assert!(manager.delete("1").await.unwrap());
        assert_eq!(names(&manager), vec!["Family"]);
    }

    #[tokio::test]
    async fn test_toggle_active_needs_no_confirmation() {
        let backend = seeded();
        let confirm = Answer::new(false);
        let mut manager = manager(&backend, confirm.clone());
        manager.mount().await.unwrap();

        manager.toggle_active("2").await.unwrap();

        assert!(!manager.types()[1].is_active);
        assert_eq!(confirm.asked.load(Ordering::SeqCst), 0);
        assert_eq!(manager.success(), Some("Deactivated \"Family\""));
    }

    #[tokio::test]
    async fn test_mount_uses_populated_cache() {
        let backend = seeded();
        let cache = PrayerTypeCache::new();
        let mut first =
            PrayerTypeManager::new(Arc::new(backend.clone()), cache.clone(), Answer::new(true));
        first.mount().await.unwrap();
        drop(first);
        backend.clear_calls();

        let mut second =
            PrayerTypeManager::new(Arc::new(backend.clone()), cache, Answer::new(true));
        second.mount().await.unwrap();

        assert!(backend.calls().is_empty());
        assert_eq!(names(&second), vec!["Personal", "Family"]);
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_state() {
        let backend = seeded();
        let mut manager = manager(&backend, Answer::new(true));
        manager.mount().await.unwrap();
        backend.fail(MockOperation::UpdatePrayerType, "permission denied");

        assert!(manager.toggle_active("1").await.is_err());

        assert!(manager.types()[0].is_active);
        assert_eq!(
            manager.error(),
            Some("Backend error: Backend returned 500: permission denied")
        );
    }

    #[tokio::test]
    async fn test_update_with_blank_name_writes_nothing() {
        let backend = seeded();
        let mut manager = manager(&backend, Answer::new(true));
        manager.mount().await.unwrap();

        manager.start_edit("2").unwrap();
        manager.form_mut().name = " \t ".to_string();
        let err = manager.submit().await.unwrap_err();

        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(manager.error(), Some("Name is required"));
        assert!(backend.writes().is_empty());
        assert_eq!(manager.editing(), Some("2"));
        assert_eq!(names(&manager), vec!["Personal", "Family"]);
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let backend = seeded();
        let mut manager = manager(&backend, Answer::new(true));
        manager.mount().await.unwrap();

        backend.fail(MockOperation::UpdatePrayerType, "permission denied");
        assert!(manager.toggle_active("1").await.is_err());
        assert!(manager.error().is_some());
        assert!(manager.success().is_none());

        backend.recover(MockOperation::UpdatePrayerType);
        manager.toggle_active("1").await.unwrap();

        assert!(manager.error().is_none());
        assert_eq!(manager.success(), Some("Deactivated \"Personal\""));
        assert!(!manager.types()[0].is_active);
    }
}
