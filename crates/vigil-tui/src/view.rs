//! View types and navigation for the Vigil TUI.
//!
//! Views represent the different screens of the console.

use std::fmt;

/// Available views in the Vigil console.
///
/// Each view represents a distinct screen with its own content and interactions.
/// Views can be switched using hotkeys or the Tab key to cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    /// Stat counters, severity chart, timeline and recent alerts
    #[default]
    Overview,
    /// Full alert list with filters
    Alerts,
    /// IPS rules
    Rules,
    /// Generated reports
    Reports,
    /// Report generation form
    GenerateReport,
    /// Attack vs defense comparison
    Comparison,
    /// Login form, shown before the dashboard when required
    Login,
}

impl View {
    /// Returns the hotkey character for this view.
    ///
    /// The login screen has no hotkey.
    pub fn hotkey(&self) -> Option<char> {
        match self {
            View::Overview => Some('o'),
            View::Alerts => Some('a'),
            View::Rules => Some('r'),
            View::Reports => Some('p'),
            View::GenerateReport => Some('g'),
            View::Comparison => Some('c'),
            View::Login => None,
        }
    }

    /// Returns the display title for this view.
    pub fn title(&self) -> &'static str {
        match self {
            View::Overview => "Overview",
            View::Alerts => "Alerts",
            View::Rules => "Rules",
            View::Reports => "Reports",
            View::GenerateReport => "Generate Report",
            View::Comparison => "Comparison",
            View::Login => "Login",
        }
    }

    /// Returns the hotkey hint for status bar display.
    pub fn hotkey_hint(&self) -> String {
        match self.hotkey() {
            Some(key) => format!("[{}] {}", key, self.title()),
            None => self.title().to_string(),
        }
    }

    /// Dashboard views in display order (for Tab cycling).
    pub const ALL: [View; 6] = [
        View::Overview,
        View::Alerts,
        View::Rules,
        View::Reports,
        View::GenerateReport,
        View::Comparison,
    ];

    /// Returns the next view in the cycle (for Tab navigation).
    pub fn next(&self) -> View {
        let idx = Self::ALL.iter().position(|v| v == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Returns the previous view in the cycle (for Shift+Tab navigation).
    pub fn prev(&self) -> View {
        let idx = Self::ALL.iter().position(|v| v == self).unwrap_or(0);
        if idx == 0 {
            Self::ALL[Self::ALL.len() - 1]
        } else {
            Self::ALL[idx - 1]
        }
    }

    /// Try to parse a view from a hotkey character.
    pub fn from_hotkey(key: char) -> Option<View> {
        match key {
            'o' => Some(View::Overview),
            'a' => Some(View::Alerts),
            'r' => Some(View::Rules),
            'p' => Some(View::Reports),
            'g' => Some(View::GenerateReport),
            'c' => Some(View::Comparison),
            _ => None,
        }
    }

    /// Whether the view is loaded only once per session.
    ///
    /// The report form resets its time range on every visit, so it is always
    /// re-initialised; the overview loads at startup.
    pub fn loads_once(&self) -> bool {
        !matches!(self, View::GenerateReport | View::Login)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_hotkeys() {
        assert_eq!(View::Overview.hotkey(), Some('o'));
        assert_eq!(View::Alerts.hotkey(), Some('a'));
        assert_eq!(View::Rules.hotkey(), Some('r'));
        assert_eq!(View::Reports.hotkey(), Some('p'));
        assert_eq!(View::GenerateReport.hotkey(), Some('g'));
        assert_eq!(View::Comparison.hotkey(), Some('c'));
        assert_eq!(View::Login.hotkey(), None);
    }

    #[test]
    fn test_view_from_hotkey() {
        for view in View::ALL {
            let key = view.hotkey().unwrap();
            assert_eq!(View::from_hotkey(key), Some(view));
        }
        // Uppercase letters are actions, not views.
        assert_eq!(View::from_hotkey('R'), None);
        assert_eq!(View::from_hotkey('x'), None);
    }

    #[test]
    fn test_view_cycling() {
        assert_eq!(View::Overview.next(), View::Alerts);
        assert_eq!(View::Comparison.next(), View::Overview); // wraps around
        assert_eq!(View::Overview.prev(), View::Comparison); // wraps around
        assert_eq!(View::Login.next(), View::Alerts);
    }

    #[test]
    fn test_hotkey_hint() {
        assert_eq!(View::Overview.hotkey_hint(), "[o] Overview");
        assert_eq!(View::GenerateReport.hotkey_hint(), "[g] Generate Report");
        assert_eq!(View::Login.hotkey_hint(), "Login");
    }

    #[test]
    fn test_loads_once() {
        assert!(View::Alerts.loads_once());
        assert!(View::Comparison.loads_once());
        assert!(!View::GenerateReport.loads_once());
    }

    #[test]
    fn test_default_view() {
        assert_eq!(View::default(), View::Overview);
    }
}
