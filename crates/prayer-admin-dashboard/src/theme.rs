//! Light/dark theme toggle

use prayer_admin_core::Theme;
use tracing::debug;

/// Current theme; not persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThemeToggle {
    current: Theme,
}

impl ThemeToggle {
    /// Start from a configured theme
    pub const fn new(initial: Theme) -> Self {
        Self { current: initial }
    }

    /// Active theme
    pub const fn current(&self) -> Theme {
        self.current
    }

    /// Switch to the other theme and return it
    pub fn toggle(&mut self) -> Theme {
        self.current = self.current.toggled();
        debug!(theme = %self.current, "Theme toggled");
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toggle_round_trips() {
        let mut toggle = ThemeToggle::new(Theme::Dark);
        assert_eq!(toggle.toggle(), Theme::Light);
        assert_eq!(toggle.toggle(), Theme::Dark);
        assert_eq!(ThemeToggle::default().current(), Theme::Light);
    }
}
