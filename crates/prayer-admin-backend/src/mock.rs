//! In-memory backend for testing
//!
//! Implements every collaborator trait over plain collections, records each
//! call it receives, and can be told to fail specific operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use prayer_admin_core::{
    ApprovalStatus, EmailSettings, NewPrayerType, PrayerType, PrayerTypeUpdate, Session,
    types::sort_for_display,
};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::time::sleep;
use uuid::Uuid;

use crate::error::{BackendError, BackendResult};
use crate::service::{
    AuthProvider, HealthProbe, ModerationBackend, ModerationKind, PrayerTypeStore, SettingsStore,
};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// [`ModerationBackend::list_pending`]
    ListPending,
    /// [`ModerationBackend::approve`]
    Approve,
    /// [`ModerationBackend::deny`]
    Deny,
    /// [`PrayerTypeStore::list`]
    ListPrayerTypes,
    /// [`PrayerTypeStore::create`]
    CreatePrayerType,
    /// [`PrayerTypeStore::update`]
    UpdatePrayerType,
    /// [`PrayerTypeStore::delete`]
    DeletePrayerType,
    /// [`HealthProbe::probe`]
    Probe,
    /// [`AuthProvider::sign_in`]
    SignIn,
    /// [`SettingsStore::email_settings`]
    LoadSettings,
    /// [`SettingsStore::save_email_settings`]
    SaveSettings,
}

/// A call received by the mock, with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// Pending queue read
    ListPending(ModerationKind),
    /// Approval
    Approve(ModerationKind, String),
    /// Denial with reason
    Deny(ModerationKind, String, String),
    /// Prayer-type list read
    ListPrayerTypes,
    /// Prayer-type insert
    CreatePrayerType(NewPrayerType),
    /// Prayer-type partial update
    UpdatePrayerType(String, PrayerTypeUpdate),
    /// Prayer-type removal
    DeletePrayerType(String),
    /// Liveness read against a table
    Probe(String),
    /// Sign-in attempt for an email
    SignIn(String),
    /// Settings read
    LoadSettings,
    /// Settings write
    SaveSettings(EmailSettings),
}

impl MockCall {
    /// Whether the call writes data
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(
            self,
            Self::Approve(..)
                | Self::Deny(..)
                | Self::CreatePrayerType(_)
                | Self::UpdatePrayerType(..)
                | Self::DeletePrayerType(_)
                | Self::SaveSettings(_)
        )
    }
}

#[derive(Debug)]
struct Failure {
    /// Successful calls still allowed before failing
    remaining_successes: usize,
    message: String,
}

#[derive(Debug, Default)]
struct MockState {
    requests: HashMap<ModerationKind, Vec<serde_json::Value>>,
    prayer_types: Vec<PrayerType>,
    settings: EmailSettings,
    credentials: HashMap<String, String>,
    reachable: bool,
    failures: HashMap<MockOperation, Failure>,
    calls: Vec<MockCall>,
}

/// In-memory backend implementing every collaborator trait
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
    delay: Duration,
    probe_delay: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an empty, reachable backend
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                reachable: true,
                ..MockState::default()
            })),
            delay: Duration::ZERO,
            probe_delay: Duration::ZERO,
        }
    }

    /// Delay every non-probe operation
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay probes only
    #[must_use]
    pub const fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    /// Seed prayer types
    #[must_use]
    pub fn with_prayer_types(self, types: Vec<PrayerType>) -> Self {
        self.state.lock().prayer_types = types;
        self
    }

    /// Seed requests of one kind; records that do not serialize are skipped
    #[must_use]
    pub fn with_requests<T: Serialize>(self, kind: ModerationKind, records: &[T]) -> Self {
        let rows = records
            .iter()
            .filter_map(|record| serde_json::to_value(record).ok())
            .collect();
        self.state.lock().requests.insert(kind, rows);
        self
    }

    /// Seed email settings
    #[must_use]
    pub fn with_settings(self, settings: EmailSettings) -> Self {
        self.state.lock().settings = settings;
        self
    }

    /// Accept a credential pair
    #[must_use]
    pub fn with_credentials(self, email: &str, password: &str) -> Self {
        self.state
            .lock()
            .credentials
            .insert(email.to_string(), password.to_string());
        self
    }

    /// Make probes succeed or fail
    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    /// Fail every call of `operation`
    pub fn fail(&self, operation: MockOperation, message: impl Into<String>) {
        self.fail_after(operation, 0, message);
    }

    /// Let `successes` calls of `operation` through, then fail the rest
    pub fn fail_after(
        &self,
        operation: MockOperation,
        successes: usize,
        message: impl Into<String>,
    ) {
        self.state.lock().failures.insert(
            operation,
            Failure {
                remaining_successes: successes,
                message: message.into(),
            },
        );
    }

    /// Stop failing `operation`
    pub fn recover(&self, operation: MockOperation) {
        self.state.lock().failures.remove(&operation);
    }

    /// Calls received so far
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Calls that wrote data
    #[must_use]
    pub fn writes(&self) -> Vec<MockCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.is_write())
            .cloned()
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Current prayer types, in display order
    #[must_use]
    pub fn prayer_types(&self) -> Vec<PrayerType> {
        let mut types = self.state.lock().prayer_types.clone();
        sort_for_display(&mut types);
        types
    }

    /// Current status of a seeded request
    #[must_use]
    pub fn request_status(&self, kind: ModerationKind, id: &str) -> Option<ApprovalStatus> {
        let state = self.state.lock();
        let row = find_request(state.requests.get(&kind)?, id)?;
        status_of(row)
    }

    /// Stored email settings
    #[must_use]
    pub fn settings(&self) -> EmailSettings {
        self.state.lock().settings.clone()
    }

    /// Record a call and decide whether it fails
    fn enter(&self, operation: MockOperation, call: MockCall) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.push(call);

        let Some(failure) = state.failures.get_mut(&operation) else {
            return Ok(());
        };
        if failure.remaining_successes > 0 {
            failure.remaining_successes -= 1;
            return Ok(());
        }
        Err(BackendError::Status {
            status: 500,
            message: failure.message.clone(),
        })
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }

    fn decide(
        &self,
        kind: ModerationKind,
        id: &str,
        next: ApprovalStatus,
        reason: Option<&str>,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        let row = state
            .requests
            .get_mut(&kind)
            .and_then(|rows| find_request_mut(rows, id))
            .ok_or_else(|| BackendError::not_found(format!("{} request {id}", kind.table())))?;

        let current = status_of(row).unwrap_or_default();
        let next = current.transition_to(next)?;

        if let Some(object) = row.as_object_mut() {
            object.insert("approval_status".to_string(), serde_json::json!(next));
            if let Some(reason) = reason {
                object.insert("denial_reason".to_string(), serde_json::json!(reason));
            }
        }
        Ok(())
    }
}

fn find_request<'a>(rows: &'a [serde_json::Value], id: &str) -> Option<&'a serde_json::Value> {
    rows.iter()
        .find(|row| row.get("id").and_then(serde_json::Value::as_str) == Some(id))
}

fn find_request_mut<'a>(
    rows: &'a mut [serde_json::Value],
    id: &str,
) -> Option<&'a mut serde_json::Value> {
    rows.iter_mut()
        .find(|row| row.get("id").and_then(serde_json::Value::as_str) == Some(id))
}

fn created_at_of(row: &serde_json::Value) -> Option<DateTime<Utc>> {
    row.get("created_at")
        .and_then(|at| serde_json::from_value(at.clone()).ok())
}

fn status_of(row: &serde_json::Value) -> Option<ApprovalStatus> {
    row.get("approval_status")
        .and_then(|status| serde_json::from_value(status.clone()).ok())
}

#[async_trait]
impl ModerationBackend for MockBackend {
    async fn list_pending(&self, kind: ModerationKind) -> BackendResult<Vec<serde_json::Value>> {
        self.enter(MockOperation::ListPending, MockCall::ListPending(kind))?;
        self.pause().await;

        let state = self.state.lock();
        let mut pending: Vec<serde_json::Value> = state
            .requests
            .get(&kind)
            .map(|rows| {
                rows.iter()
                    .filter(|row| status_of(row).unwrap_or_default().is_pending())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Newest first, as the REST backend orders them
        pending.sort_by_key(|row| std::cmp::Reverse(created_at_of(row)));
        Ok(pending)
    }

    async fn approve(&self, kind: ModerationKind, id: &str) -> BackendResult<()> {
        self.enter(
            MockOperation::Approve,
            MockCall::Approve(kind, id.to_string()),
        )?;
        self.pause().await;
        self.decide(kind, id, ApprovalStatus::Approved, None)
    }

    async fn deny(&self, kind: ModerationKind, id: &str, reason: &str) -> BackendResult<()> {
        self.enter(
            MockOperation::Deny,
            MockCall::Deny(kind, id.to_string(), reason.to_string()),
        )?;
        self.pause().await;
        self.decide(kind, id, ApprovalStatus::Denied, Some(reason))
    }
}

#[async_trait]
impl PrayerTypeStore for MockBackend {
    async fn list(&self) -> BackendResult<Vec<PrayerType>> {
        self.enter(MockOperation::ListPrayerTypes, MockCall::ListPrayerTypes)?;
        self.pause().await;
        Ok(self.prayer_types())
    }

    async fn create(&self, record: &NewPrayerType) -> BackendResult<PrayerType> {
        self.enter(
            MockOperation::CreatePrayerType,
            MockCall::CreatePrayerType(record.clone()),
        )?;
        self.pause().await;

        let created = PrayerType {
            id: Uuid::new_v4().to_string(),
            name: record.name.clone(),
            display_order: record.display_order,
            is_active: record.is_active,
            created_at: Utc::now(),
        };
        self.state.lock().prayer_types.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, changes: &PrayerTypeUpdate) -> BackendResult<()> {
        self.enter(
            MockOperation::UpdatePrayerType,
            MockCall::UpdatePrayerType(id.to_string(), changes.clone()),
        )?;
        self.pause().await;

        let mut state = self.state.lock();
        let record = state
            .prayer_types
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| BackendError::not_found(format!("prayer type {id}")))?;
        changes.apply_to(record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> BackendResult<()> {
        self.enter(
            MockOperation::DeletePrayerType,
            MockCall::DeletePrayerType(id.to_string()),
        )?;
        self.pause().await;

        let mut state = self.state.lock();
        let before = state.prayer_types.len();
        state.prayer_types.retain(|record| record.id != id);
        if state.prayer_types.len() == before {
            return Err(BackendError::not_found(format!("prayer type {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for MockBackend {
    async fn probe(&self, table: &str, _limit: u32, _timeout: Duration) -> BackendResult<()> {
        self.enter(MockOperation::Probe, MockCall::Probe(table.to_string()))?;
        if !self.probe_delay.is_zero() {
            sleep(self.probe_delay).await;
        }

        if self.state.lock().reachable {
            Ok(())
        } else {
            Err(BackendError::unavailable("connection refused"))
        }
    }
}

#[async_trait]
impl AuthProvider for MockBackend {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Option<Session>> {
        self.enter(MockOperation::SignIn, MockCall::SignIn(email.to_string()))?;
        self.pause().await;

        let accepted = self
            .state
            .lock()
            .credentials
            .get(email)
            .is_some_and(|expected| expected == password);

        Ok(accepted.then(|| Session {
            access_token: format!("mock-token-{}", Uuid::new_v4()),
            user_email: Some(email.to_string()),
            expires_at: None,
        }))
    }
}

#[async_trait]
impl SettingsStore for MockBackend {
    async fn email_settings(&self) -> BackendResult<EmailSettings> {
        self.enter(MockOperation::LoadSettings, MockCall::LoadSettings)?;
        self.pause().await;
        Ok(self.settings())
    }

    async fn save_email_settings(&self, settings: &EmailSettings) -> BackendResult<()> {
        self.enter(
            MockOperation::SaveSettings,
            MockCall::SaveSettings(settings.clone()),
        )?;
        self.pause().await;
        self.state.lock().settings = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use prayer_admin_core::DeletionRequest;
    use pretty_assertions::assert_eq;

    fn deletion(id: &str) -> DeletionRequest {
        DeletionRequest {
            id: id.to_string(),
            prayer_id: format!("prayer-{id}"),
            prayer_title: None,
            requested_by: "Ann".to_string(),
            requested_email: None,
            reason: "dup".to_string(),
            created_at: Utc::now(),
            approval_status: ApprovalStatus::Pending,
            denial_reason: None,
        }
    }

    #[tokio::test]
    async fn test_decided_requests_leave_pending_list() {
        let backend = MockBackend::new().with_requests(
            ModerationKind::PrayerDeletion,
            &[deletion("r1"), deletion("r2")],
        );

        backend
            .approve(ModerationKind::PrayerDeletion, "r1")
            .await
            .unwrap();

        let pending = backend
            .list_pending(ModerationKind::PrayerDeletion)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(
            backend.request_status(ModerationKind::PrayerDeletion, "r1"),
            Some(ApprovalStatus::Approved)
        );
    }

    #[tokio::test]
    async fn test_pending_list_is_newest_first() {
        let mut older = deletion("old");
        older.created_at = Utc::now() - chrono::Duration::hours(2);
        let backend = MockBackend::new().with_requests(
            ModerationKind::PrayerDeletion,
            &[older, deletion("new")],
        );

        let pending = backend
            .list_pending(ModerationKind::PrayerDeletion)
            .await
            .unwrap();
        let ids: Vec<_> = pending
            .iter()
            .filter_map(|row| row.get("id").and_then(serde_json::Value::as_str))
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_second_decision_is_rejected() {
        let backend =
            MockBackend::new().with_requests(ModerationKind::PrayerDeletion, &[deletion("r1")]);

        backend
            .deny(ModerationKind::PrayerDeletion, "r1", "not valid")
            .await
            .unwrap();
        let err = backend
            .approve(ModerationKind::PrayerDeletion, "r1")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("denied"));
        assert_eq!(
            backend.request_status(ModerationKind::PrayerDeletion, "r1"),
            Some(ApprovalStatus::Denied)
        );
    }

    #[tokio::test]
    async fn test_fail_after_allows_some_calls() {
        let backend = MockBackend::new();
        backend.fail_after(MockOperation::ListPrayerTypes, 1, "boom");

        assert!(backend.list().await.is_ok());
        let err = backend.list().await.unwrap_err();
        assert_eq!(err.to_string(), "Backend returned 500: boom");

        backend.recover(MockOperation::ListPrayerTypes);
        assert!(backend.list().await.is_ok());
        assert_eq!(backend.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_sign_in_checks_credentials() {
        let backend = MockBackend::new().with_credentials("admin@example.org", "hunter2");

        assert!(backend.sign_in("admin@example.org", "wrong").await.unwrap().is_none());
        let session = backend
            .sign_in("admin@example.org", "hunter2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.user_email.as_deref(), Some("admin@example.org"));
    }

    #[tokio::test]
    async fn test_probe_follows_reachability() {
        let backend = MockBackend::new();
        assert!(backend.probe("prayers", 1, Duration::from_secs(1)).await.is_ok());

        backend.set_reachable(false);
        let err = backend
            .probe("prayers", 1, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
        assert!(backend.writes().is_empty());
    }
}
