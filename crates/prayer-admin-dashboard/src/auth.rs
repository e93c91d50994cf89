//! Sign-in form
//!
//! Only one sign-in attempt may be in flight; submits arriving meanwhile are
//! ignored. Each new attempt clears the previous error first.

use parking_lot::Mutex;
use prayer_admin_backend::AuthProvider;
use prayer_admin_core::{Error, Session};
use std::sync::Arc;
use tracing::{info, warn};

use crate::card::CardAction;

/// Submit button label
pub const SIGN_IN_LABEL: &str = "Sign In";
/// Submit button label while an attempt is in flight
pub const SIGNING_IN_LABEL: &str = "Signing in...";
/// Error shown when credentials are rejected
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Result of a submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials accepted
    SignedIn(Session),
    /// Attempt failed; the message is shown inline
    Rejected(String),
    /// Another attempt is still in flight
    Ignored,
}

/// Rendered form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthView {
    /// Email as typed
    pub email: String,
    /// Submit button
    pub submit: CardAction,
    /// Inline error
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct AuthInner {
    email: String,
    password: String,
    in_flight: bool,
    error: Option<String>,
    session: Option<Session>,
}

/// Credential form guarded by an in-flight lock
#[derive(Clone)]
pub struct AuthGate {
    provider: Arc<dyn AuthProvider>,
    inner: Arc<Mutex<AuthInner>>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("AuthGate")
            .field("email", &inner.email)
            .field("in_flight", &inner.in_flight)
            .field("signed_in", &inner.session.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    /// Empty form
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            inner: Arc::new(Mutex::new(AuthInner::default())),
        }
    }

    /// Update the email field
    pub fn set_email(&self, email: impl Into<String>) {
        self.inner.lock().email = email.into();
    }

    /// Update the password field
    pub fn set_password(&self, password: impl Into<String>) {
        self.inner.lock().password = password.into();
    }

    /// Whether an attempt is in flight
    pub fn is_busy(&self) -> bool {
        self.inner.lock().in_flight
    }

    /// Inline error
    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    /// Session from the last successful attempt
    pub fn session(&self) -> Option<Session> {
        self.inner.lock().session.clone()
    }

    /// Attempt to sign in with the current fields
    pub async fn submit(&self) -> AuthOutcome {
        let (email, password) = {
            let mut inner = self.inner.lock();
            if inner.in_flight {
                return AuthOutcome::Ignored;
            }
            inner.error = None;

            let email = inner.email.trim().to_string();
            if email.is_empty() || inner.password.is_empty() {
                let message = "Email and password are required".to_string();
                inner.error = Some(message.clone());
                return AuthOutcome::Rejected(message);
            }

            inner.in_flight = true;
            (email, inner.password.clone())
        };

        let result = self.provider.sign_in(&email, &password).await;

        let mut inner = self.inner.lock();
        inner.in_flight = false;
        match result {
            Ok(Some(session)) => {
                info!(%email, "Admin signed in");
                inner.password.clear();
                inner.session = Some(session.clone());
                AuthOutcome::SignedIn(session)
            }
            Ok(None) => {
                warn!(%email, "Sign-in rejected");
                inner.error = Some(INVALID_CREDENTIALS.to_string());
                AuthOutcome::Rejected(INVALID_CREDENTIALS.to_string())
            }
            Err(err) => {
                let message = Error::from(err).to_string();
                warn!(%email, error = %message, "Sign-in failed");
                inner.error = Some(message.clone());
                AuthOutcome::Rejected(message)
            }
        }
    }

    /// Render the form
    pub fn render(&self) -> AuthView {
        let inner = self.inner.lock();
        AuthView {
            email: inner.email.clone(),
            submit: CardAction::new(SIGN_IN_LABEL)
                .with_busy_label(SIGNING_IN_LABEL)
                .busy(inner.in_flight),
            error: inner.error.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use prayer_admin_backend::{MockBackend, MockCall, MockOperation};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn gate(backend: &MockBackend) -> AuthGate {
        let gate = AuthGate::new(Arc::new(backend.clone()));
        gate.set_email("admin@example.org");
        gate.set_password("hunter2");
        gate
    }

    #[tokio::test]
    async fn test_successful_sign_in() {
        let backend = MockBackend::new().with_credentials("admin@example.org", "hunter2");
        let gate = gate(&backend);

        let outcome = gate.submit().await;

        assert!(matches!(outcome, AuthOutcome::SignedIn(_)));
        assert!(gate.session().is_some());
        assert!(gate.error().is_none());
    }

    #[tokio::test]
    async fn test_rejected_then_retry_clears_error() {
        let backend = MockBackend::new().with_credentials("admin@example.org", "other");
        let gate = gate(&backend);

        assert_eq!(
            gate.submit().await,
            AuthOutcome::Rejected(INVALID_CREDENTIALS.to_string())
        );
        assert_eq!(gate.render().error.as_deref(), Some(INVALID_CREDENTIALS));

        backend.fail(MockOperation::SignIn, "auth service down");
        let outcome = gate.submit().await;
        let AuthOutcome::Rejected(message) = outcome.clone() else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert!(message.contains("auth service down"));
        assert_eq!(gate.error(), Some(message));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_while_busy_is_ignored() {
        let backend = MockBackend::new()
            .with_credentials("admin@example.org", "hunter2")
            .with_delay(Duration::from_secs(2));
        let gate = gate(&backend);

        let first = tokio::spawn({
            let gate = gate.clone();
            async move { gate.submit().await }
        });
        while !gate.is_busy() {
            tokio::task::yield_now().await;
        }

        let view = gate.render();
        assert!(!view.submit.enabled);
        assert_eq!(view.submit.display_label(), SIGNING_IN_LABEL);
        assert_eq!(gate.submit().await, AuthOutcome::Ignored);

        assert!(matches!(first.await.unwrap(), AuthOutcome::SignedIn(_)));
        assert!(gate.render().submit.enabled);
        let sign_ins = backend
            .calls()
            .iter()
            .filter(|call| matches!(call, MockCall::SignIn(_)))
            .count();
        assert_eq!(sign_ins, 1);
    }

    #[tokio::test]
    async fn test_blank_fields_never_reach_provider() {
        let backend = MockBackend::new();
        let gate = AuthGate::new(Arc::new(backend.clone()));

        assert!(matches!(gate.submit().await, AuthOutcome::Rejected(_)));
        assert!(backend.calls().is_empty());
    }
}
