//! Theme system for the Vigil TUI.
//!
//! Two palettes, dark and light, toggled at runtime with `T`. The choice is
//! written to `~/.vigil/theme.yaml` and wins over the config file's `theme`
//! on the next start.

use std::fs;
use std::path::{Path, PathBuf};

use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use vigil_config::ThemePreference;
use vigil_core::SeverityBucket;

/// Color palette for a theme.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    /// Primary headers and focused borders
    pub header: Color,
    /// Hotkey hints
    pub hotkey: Color,
    /// Normal text
    pub text: Color,
    /// Secondary text (timestamps, dim info)
    pub text_dim: Color,
    /// Unfocused borders
    pub border_dim: Color,
    /// Selected table row background
    pub selection: Color,
    /// Status: healthy/success
    pub status_healthy: Color,
    /// Status: warning
    pub status_warning: Color,
    /// Status: error
    pub status_error: Color,
    pub severity_critical: Color,
    pub severity_high: Color,
    pub severity_medium: Color,
    pub severity_low: Color,
    /// Attack side of the comparison view
    pub attack: Color,
    /// Defense side of the comparison view
    pub defense: Color,
}

/// Complete theme definition.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemePreference,
    pub colors: ThemeColors,
}

impl Theme {
    pub fn dark_theme() -> Self {
        Self {
            name: ThemePreference::Dark,
            colors: ThemeColors {
                header: Color::Cyan,
                hotkey: Color::Yellow,
                text: Color::White,
                text_dim: Color::Gray,
                border_dim: Color::DarkGray,
                selection: Color::Rgb(42, 49, 66),
                status_healthy: Color::Green,
                status_warning: Color::Yellow,
                status_error: Color::Red,
                severity_critical: Color::Rgb(239, 68, 68),
                severity_high: Color::Rgb(245, 158, 11),
                severity_medium: Color::Rgb(59, 130, 246),
                severity_low: Color::Rgb(148, 163, 184),
                attack: Color::LightRed,
                defense: Color::LightGreen,
            },
        }
    }

    pub fn light_theme() -> Self {
        Self {
            name: ThemePreference::Light,
            colors: ThemeColors {
                header: Color::Blue,
                hotkey: Color::Magenta,
                text: Color::Black,
                text_dim: Color::DarkGray,
                border_dim: Color::Gray,
                selection: Color::Rgb(219, 234, 254),
                status_healthy: Color::Green,
                status_warning: Color::Rgb(180, 83, 9),
                status_error: Color::Red,
                severity_critical: Color::Rgb(220, 38, 38),
                severity_high: Color::Rgb(217, 119, 6),
                severity_medium: Color::Rgb(37, 99, 235),
                severity_low: Color::Rgb(71, 85, 105),
                attack: Color::Red,
                defense: Color::Green,
            },
        }
    }

    /// Get a theme by name.
    pub fn by_name(name: ThemePreference) -> Self {
        match name {
            ThemePreference::Dark => Self::dark_theme(),
            ThemePreference::Light => Self::light_theme(),
        }
    }

    /// Badge color for a severity bucket.
    pub fn severity_color(&self, bucket: Option<SeverityBucket>) -> Color {
        match bucket {
            Some(SeverityBucket::Critical) => self.colors.severity_critical,
            Some(SeverityBucket::High) => self.colors.severity_high,
            Some(SeverityBucket::Medium) => self.colors.severity_medium,
            Some(SeverityBucket::Low) => self.colors.severity_low,
            None => self.colors.text_dim,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark_theme()
    }
}

/// Theme file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ThemeFile {
    current_theme: ThemePreference,
}

/// Loads, toggles and saves the theme.
pub struct ThemeManager {
    current: Theme,
    config_path: Option<PathBuf>,
}

impl ThemeManager {
    /// Theme manager that never touches disk.
    pub fn in_memory(name: ThemePreference) -> Self {
        Self {
            current: Theme::by_name(name),
            config_path: None,
        }
    }

    /// Default theme file location, `~/.vigil/theme.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        vigil_core::logging::vigil_home()
            .ok()
            .map(|home| home.join("theme.yaml"))
    }

    /// Load the saved theme from `path`, falling back to `fallback` when
    /// nothing usable is saved there.
    pub fn load(path: PathBuf, fallback: ThemePreference) -> Self {
        let name = match Self::read(&path) {
            Some(name) => {
                tracing::info!(theme = ?name, "loaded saved theme");
                name
            }
            None => fallback,
        };
        Self {
            current: Theme::by_name(name),
            config_path: Some(path),
        }
    }

    fn read(path: &Path) -> Option<ThemePreference> {
        let content = fs::read_to_string(path).ok()?;
        match serde_yaml::from_str::<ThemeFile>(&content) {
            Ok(file) => Some(file.current_theme),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "ignoring unreadable theme file"
                );
                None
            }
        }
    }

    /// Save current theme to the theme file.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };
        let file = ThemeFile {
            current_theme: self.current.name,
        };
        let content = serde_yaml::to_string(&file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "saved theme");
        Ok(())
    }

    /// Get the current theme.
    pub fn current(&self) -> &Theme {
        &self.current
    }

    /// Switch between dark and light and persist the choice.
    pub fn toggle(&mut self) -> ThemePreference {
        let next = match self.current.name {
            ThemePreference::Dark => ThemePreference::Light,
            ThemePreference::Light => ThemePreference::Dark,
        };
        self.current = Theme::by_name(next);

        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "failed to save theme");
        }
        next
    }

    pub fn theme_name(&self) -> ThemePreference {
        self.current.name
    }
}

impl Default for ThemeManager {
    fn default() -> Self {
        Self::in_memory(ThemePreference::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_toggle_flips_between_two_themes() {
        let mut manager = ThemeManager::in_memory(ThemePreference::Dark);
        assert_eq!(manager.toggle(), ThemePreference::Light);
        assert_eq!(manager.current().colors.text, Color::Black);
        assert_eq!(manager.toggle(), ThemePreference::Dark);
    }

    #[test]
    fn test_toggle_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("theme.yaml");

        let mut manager = ThemeManager::load(path.clone(), ThemePreference::Dark);
        manager.toggle();
        assert!(path.exists());

        let reloaded = ThemeManager::load(path, ThemePreference::Dark);
        assert_eq!(reloaded.theme_name(), ThemePreference::Light);
    }

    #[test]
    fn test_unreadable_file_uses_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("theme.yaml");
        std::fs::write(&path, "current_theme: neon\n").unwrap();

        let manager = ThemeManager::load(path, ThemePreference::Light);
        assert_eq!(manager.theme_name(), ThemePreference::Light);
    }

    #[test]
    fn test_severity_colors_distinct() {
        let theme = Theme::dark_theme();
        let colors: Vec<Color> = SeverityBucket::ALL
            .iter()
            .map(|b| theme.severity_color(Some(*b)))
            .collect();
        for (i, a) in colors.iter().enumerate() {
            for b in colors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert_eq!(theme.severity_color(None), theme.colors.text_dim);
    }
}
