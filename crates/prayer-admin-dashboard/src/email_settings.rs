//! Admin notification email settings

use prayer_admin_backend::SettingsStore;
use prayer_admin_core::{EmailSettings, Error, Result, types::validate_email};
use std::sync::Arc;
use tracing::{info, warn};

/// Editor for the admin notification address list
pub struct EmailSettingsPanel {
    store: Arc<dyn SettingsStore>,
    settings: EmailSettings,
    error: Option<String>,
    success: Option<String>,
}

impl std::fmt::Debug for EmailSettingsPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSettingsPanel")
            .field("settings", &self.settings)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl EmailSettingsPanel {
    /// Panel with default settings until [`load`](Self::load) runs
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            settings: EmailSettings::default(),
            error: None,
            success: None,
        }
    }

    /// Fetch the stored settings
    pub async fn load(&mut self) -> Result<()> {
        let loaded = self.store.email_settings().await;
        match loaded {
            Ok(settings) => {
                self.settings = settings;
                self.error = None;
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Settings as edited
    pub const fn settings(&self) -> &EmailSettings {
        &self.settings
    }

    /// Visible error message
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Visible success message
    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }

    /// Add an address locally; call [`save`](Self::save) to persist
    pub fn add_email(&mut self, address: &str) -> Result<()> {
        let address = validate_email(address).map_err(|err| self.fail(err))?;
        if self
            .settings
            .notification_emails
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&address))
        {
            return Err(self.fail(Error::validation(
                "email",
                format!("{address} is already on the list"),
            )));
        }

        self.settings.notification_emails.push(address);
        self.error = None;
        Ok(())
    }

    /// Remove an address locally. Returns whether it was present.
    pub fn remove_email(&mut self, address: &str) -> bool {
        let address = address.trim();
        let before = self.settings.notification_emails.len();
        self.settings
            .notification_emails
            .retain(|existing| !existing.eq_ignore_ascii_case(address));
        before != self.settings.notification_emails.len()
    }

    /// Toggle emails about new prayers
    pub fn set_notify_on_new_prayer(&mut self, enabled: bool) {
        self.settings.notify_on_new_prayer = enabled;
    }

    /// Persist the edited settings
    pub async fn save(&mut self) -> Result<()> {
        self.settings.validate().map_err(|err| self.fail(err))?;

        let saved = self.store.save_email_settings(&self.settings).await;
        match saved {
            Ok(()) => {
                info!(
                    recipients = self.settings.notification_emails.len(),
                    "Email settings saved"
                );
                self.error = None;
                self.success = Some("Settings saved".to_string());
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        let message = match &err {
            Error::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };
        warn!(error = %message, "Email settings operation failed");
        self.error = Some(message);
        self.success = None;
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use prayer_admin_backend::{MockBackend, MockOperation};
    use pretty_assertions::assert_eq;

    fn panel(backend: &MockBackend) -> EmailSettingsPanel {
        EmailSettingsPanel::new(Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_add_and_save() {
        let backend = MockBackend::new();
        let mut panel = panel(&backend);
        panel.load().await.unwrap();

        panel.add_email("  admin@example.org ").unwrap();
        panel.set_notify_on_new_prayer(true);
        panel.save().await.unwrap();

        assert_eq!(
            backend.settings(),
            EmailSettings {
                notification_emails: vec!["admin@example.org".to_string()],
                notify_on_new_prayer: true,
            }
        );
        assert_eq!(panel.success(), Some("Settings saved"));
    }

    #[test]
    fn test_rejects_malformed_and_duplicate_addresses() {
        let backend = MockBackend::new();
        let mut panel = panel(&backend);

        assert!(panel.add_email("not-an-email").is_err());
        assert!(panel.error().unwrap().contains("not a valid email"));

        panel.add_email("admin@example.org").unwrap();
        assert!(panel.error().is_none());
        assert!(panel.add_email("ADMIN@example.org").is_err());
        assert_eq!(panel.settings().notification_emails.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_save_failure() {
        let backend = MockBackend::new().with_settings(EmailSettings {
            notification_emails: vec!["a@example.org".to_string(), "b@example.org".to_string()],
            notify_on_new_prayer: false,
        });
        let mut panel = panel(&backend);
        panel.load().await.unwrap();

        assert!(panel.remove_email("a@example.org"));
        assert!(!panel.remove_email("missing@example.org"));

        backend.fail(MockOperation::SaveSettings, "read-only");
        assert!(panel.save().await.is_err());
        assert!(panel.error().unwrap().contains("read-only"));
        assert_eq!(backend.settings().notification_emails.len(), 2);
    }
}
