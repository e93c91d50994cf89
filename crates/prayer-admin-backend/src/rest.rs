//! REST client for the hosted backend
//!
//! Tables are served PostgREST-style under `/rest/v1/{table}` and password
//! sign-in goes through `/auth/v1/token`. Every request carries the project's
//! anon key; once signed in, the session token replaces it as the bearer.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use prayer_admin_core::{
    BackendConfig, DeletionRequest, EmailSettings, NewPrayerType, PrayerType, PrayerTypeUpdate,
    PreferenceChangeRequest, Session, UpdateDeletionRequest,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::error::{BackendError, BackendResult};
use crate::service::{
    AuthProvider, HealthProbe, ModerationBackend, ModerationKind, PrayerTypeStore, SettingsStore,
};

const PRAYER_TYPES_TABLE: &str = "prayer_types";
const PRAYERS_TABLE: &str = "prayers";
const PRAYER_UPDATES_TABLE: &str = "prayer_updates";
const SUBSCRIBERS_TABLE: &str = "email_subscribers";
const SETTINGS_TABLE: &str = "admin_settings";
const SETTINGS_ROW_ID: i64 = 1;

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

/// HTTP client for the hosted backend
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("signed_in", &self.access_token.read().is_some())
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            anon_key: config.anon_key.clone(),
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Use a session token for subsequent requests
    pub fn set_session(&self, session: &Session) {
        *self.access_token.write() = Some(session.access_token.clone());
    }

    /// Whether a session token is in use
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.access_token.read().is_some()
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());

        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, &self.table_url(table))
    }

    /// Send a request and turn non-success statuses into errors
    async fn send(builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        debug!(status = status.as_u16(), %message, "Backend request rejected");
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> BackendResult<T> {
        let response = Self::send(builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetch the pending row of a request, or fail if it was already decided
    async fn pending_row(
        &self,
        kind: ModerationKind,
        id: &str,
    ) -> BackendResult<serde_json::Value> {
        let rows: Vec<serde_json::Value> = Self::fetch(
            self.table(Method::GET, kind.table()).query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{id}")),
                ("approval_status", "eq.pending".to_string()),
            ]),
        )
        .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| {
                BackendError::not_found(format!("pending {} request {id}", kind.table()))
            })
    }

    /// Patch a request that is still pending
    async fn decide(
        &self,
        kind: ModerationKind,
        id: &str,
        changes: serde_json::Value,
    ) -> BackendResult<()> {
        let rows: Vec<serde_json::Value> = Self::fetch(
            self.table(Method::PATCH, kind.table())
                .query(&[
                    ("id", format!("eq.{id}")),
                    ("approval_status", "eq.pending".to_string()),
                ])
                .header("Prefer", "return=representation")
                .json(&changes),
        )
        .await?;

        if rows.is_empty() {
            return Err(BackendError::not_found(format!(
                "pending {} request {id}",
                kind.table()
            )));
        }
        Ok(())
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> BackendResult<()> {
        Self::send(
            self.table(Method::DELETE, table)
                .query(&[("id", format!("eq.{id}"))]),
        )
        .await?;
        Ok(())
    }

    /// Apply the effect an approval stands for
    async fn apply_approval(
        &self,
        kind: ModerationKind,
        row: serde_json::Value,
    ) -> BackendResult<()> {
        match kind {
            ModerationKind::PrayerDeletion => {
                let request: DeletionRequest = serde_json::from_value(row)?;
                self.delete_by_id(PRAYERS_TABLE, &request.prayer_id).await
            }
            ModerationKind::UpdateDeletion => {
                let request: UpdateDeletionRequest = serde_json::from_value(row)?;
                self.delete_by_id(PRAYER_UPDATES_TABLE, &request.update_id)
                    .await
            }
            ModerationKind::PreferenceChange => {
                let request: PreferenceChangeRequest = serde_json::from_value(row)?;
                Self::send(
                    self.table(Method::POST, SUBSCRIBERS_TABLE)
                        .query(&[("on_conflict", "email")])
                        .header("Prefer", "resolution=merge-duplicates")
                        .json(&json!({
                            "name": request.name,
                            "email": request.email,
                            "is_active": request.receive_new_prayer_notifications,
                        })),
                )
                .await?;
                Ok(())
            }
        }
    }
}

/// Pull a human readable message out of an error body
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(message) = value.get(key).and_then(serde_json::Value::as_str) {
                return message.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl ModerationBackend for RestClient {
    async fn list_pending(&self, kind: ModerationKind) -> BackendResult<Vec<serde_json::Value>> {
        Self::fetch(self.table(Method::GET, kind.table()).query(&[
            ("select", "*"),
            ("approval_status", "eq.pending"),
            ("order", "created_at.desc"),
        ]))
        .await
    }

    /// Marks the request approved, then applies its effect.
    ///
    /// The status patch only matches a pending row, so a request decided
    /// elsewhere fails here and its effect is never applied twice. Deleting
    /// the prayer afterwards is safe even when the backend cascades the
    /// delete into the request table.
    async fn approve(&self, kind: ModerationKind, id: &str) -> BackendResult<()> {
        let row = self.pending_row(kind, id).await?;
        self.decide(
            kind,
            id,
            json!({
                "approval_status": "approved",
                "reviewed_at": Utc::now(),
            }),
        )
        .await?;
        self.apply_approval(kind, row).await?;

        info!(kind = kind.table(), id, "Request approved");
        Ok(())
    }

    async fn deny(&self, kind: ModerationKind, id: &str, reason: &str) -> BackendResult<()> {
        if reason.trim().is_empty() {
            return Err(BackendError::Validation {
                message: "denial reason is required".to_string(),
            });
        }

        self.decide(
            kind,
            id,
            json!({
                "approval_status": "denied",
                "denial_reason": reason,
                "reviewed_at": Utc::now(),
            }),
        )
        .await?;

        info!(kind = kind.table(), id, "Request denied");
        Ok(())
    }
}

#[async_trait]
impl PrayerTypeStore for RestClient {
    async fn list(&self) -> BackendResult<Vec<PrayerType>> {
        Self::fetch(
            self.table(Method::GET, PRAYER_TYPES_TABLE)
                .query(&[("select", "*"), ("order", "display_order.asc")]),
        )
        .await
    }

    async fn create(&self, record: &NewPrayerType) -> BackendResult<PrayerType> {
        let rows: Vec<PrayerType> = Self::fetch(
            self.table(Method::POST, PRAYER_TYPES_TABLE)
                .header("Prefer", "return=representation")
                .json(record),
        )
        .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::not_found("created prayer type"))
    }

    async fn update(&self, id: &str, changes: &PrayerTypeUpdate) -> BackendResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let rows: Vec<serde_json::Value> = Self::fetch(
            self.table(Method::PATCH, PRAYER_TYPES_TABLE)
                .query(&[("id", format!("eq.{id}"))])
                .header("Prefer", "return=representation")
                .json(changes),
        )
        .await?;

        if rows.is_empty() {
            return Err(BackendError::not_found(format!("prayer type {id}")));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> BackendResult<()> {
        let rows: Vec<serde_json::Value> = Self::fetch(
            self.table(Method::DELETE, PRAYER_TYPES_TABLE)
                .query(&[("id", format!("eq.{id}"))])
                .header("Prefer", "return=representation"),
        )
        .await?;

        if rows.is_empty() {
            return Err(BackendError::not_found(format!("prayer type {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for RestClient {
    async fn probe(&self, table: &str, limit: u32, timeout: Duration) -> BackendResult<()> {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let builder = self
            .table(Method::GET, table)
            .query(&[("select", "*".to_string()), ("limit", limit.to_string())])
            .timeout(timeout);

        match Self::send(builder).await {
            Ok(_) => Ok(()),
            Err(BackendError::Http(err)) if err.is_timeout() => {
                Err(BackendError::Timeout { millis })
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl AuthProvider for RestClient {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Option<Session>> {
        let url = format!("{}/auth/v1/token", self.base_url);
        let builder = self
            .client
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }));

        let token: TokenResponse = match Self::fetch(builder).await {
            Ok(token) => token,
            Err(BackendError::Status {
                status: 400 | 401,
                message,
            }) => {
                warn!(%message, "Sign-in rejected");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let session = Session {
            access_token: token.access_token,
            user_email: token
                .user
                .and_then(|user| user.email)
                .or_else(|| Some(email.to_string())),
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        };

        self.set_session(&session);
        info!(email, "Signed in");
        Ok(Some(session))
    }
}

#[async_trait]
impl SettingsStore for RestClient {
    async fn email_settings(&self) -> BackendResult<EmailSettings> {
        let rows: Vec<EmailSettings> = Self::fetch(
            self.table(Method::GET, SETTINGS_TABLE).query(&[
                ("select", "notification_emails,notify_on_new_prayer".to_string()),
                ("id", format!("eq.{SETTINGS_ROW_ID}")),
            ]),
        )
        .await?;

        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn save_email_settings(&self, settings: &EmailSettings) -> BackendResult<()> {
        let mut body = serde_json::to_value(settings)?;
        if let Some(object) = body.as_object_mut() {
            object.insert("id".to_string(), json!(SETTINGS_ROW_ID));
        }

        Self::send(
            self.table(Method::POST, SETTINGS_TABLE)
                .query(&[("on_conflict", "id")])
                .header("Prefer", "resolution=merge-duplicates")
                .json(&body),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_message_prefers_json_message() {
        let body = r#"{"code":"23505","message":"duplicate key value","details":null}"#;
        assert_eq!(error_message(StatusCode::CONFLICT, body), "duplicate key value");

        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "Invalid login credentials"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_text_or_reason() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "upstream down"
        );
        assert_eq!(
            error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
    }

    #[test]
    fn test_debug_hides_keys() {
        let config = BackendConfig {
            url: "https://project.example.co/".to_string(),
            anon_key: "secret-anon-key".to_string(),
            request_timeout: 5,
        };
        let client = RestClient::new(&config).unwrap_or_else(|e| panic!("{e}"));
        let debug = format!("{client:?}");

        assert!(debug.contains("https://project.example.co"));
        assert!(!debug.contains("secret-anon-key"));
        assert!(!client.is_signed_in());
    }
}
