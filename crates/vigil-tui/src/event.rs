//! Event handling for the Vigil TUI.
//!
//! Provides keyboard input handling and event routing.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use vigil_api::TimelineRange;

use crate::view::View;

/// Application-level events that can trigger state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Switch to a specific view
    SwitchView(View),
    /// Cycle to the next view
    NextView,
    /// Cycle to the previous view
    PrevView,
    /// Show help overlay
    ShowHelp,
    /// Request application quit
    Quit,
    /// Force quit (Ctrl+C)
    ForceQuit,
    /// Reload the current view
    Refresh,
    /// Cancel current operation, close popups
    Cancel,
    NavigateUp,
    NavigateDown,
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,
    /// Open details, download, submit a form
    Select,
    /// Cycle the focused choice
    Toggle,
    /// Change the timeline range
    SetRange(TimelineRange),
    /// Cycle the severity or category filter
    CycleFilter,
    /// Cycle the alert count
    CycleCount,
    /// Start typing a rule search
    StartSearch,
    Delete,
    /// Answer yes to a confirmation prompt
    Confirm,
    BlockIp,
    UnblockIp,
    ToggleTheme,
    /// Move focus inside a form
    FocusNext,
    FocusPrev,
    /// Text input character
    TextInput(char),
    /// Backspace in text input
    Backspace,
    /// Submit text input
    Submit,
    /// No action needed
    None,
}

/// Input handler for converting key events to app events.
#[derive(Debug, Default)]
pub struct InputHandler {
    /// Whether a text field has the keyboard
    text_mode: bool,
}

impl InputHandler {
    /// Create a new input handler.
    pub fn new() -> Self {
        Self { text_mode: false }
    }

    /// Set whether text input mode is active.
    pub fn set_text_mode(&mut self, active: bool) {
        self.text_mode = active;
    }

    pub fn is_text_mode(&self) -> bool {
        self.text_mode
    }

    /// Handle a key event and return the corresponding app event.
    pub fn handle_key(&mut self, key: KeyEvent) -> AppEvent {
        // Ctrl+C always force quits
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppEvent::ForceQuit;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('l') {
            return AppEvent::Refresh;
        }

        if key.code == KeyCode::Esc {
            return AppEvent::Cancel;
        }

        if self.text_mode {
            return self.handle_text_input(key);
        }

        self.handle_normal_mode(key)
    }

    /// Handle input while a text field is focused.
    fn handle_text_input(&self, key: KeyEvent) -> AppEvent {
        match key.code {
            KeyCode::Enter => AppEvent::Submit,
            KeyCode::Backspace => AppEvent::Backspace,
            KeyCode::Char(c) => AppEvent::TextInput(c),
            KeyCode::Tab => AppEvent::FocusNext,
            KeyCode::BackTab => AppEvent::FocusPrev,
            KeyCode::Up => AppEvent::NavigateUp,
            KeyCode::Down => AppEvent::NavigateDown,
            _ => AppEvent::None,
        }
    }

    /// Handle input when in normal navigation mode.
    fn handle_normal_mode(&mut self, key: KeyEvent) -> AppEvent {
        match key.code {
            KeyCode::Char('q') => AppEvent::Quit,
            KeyCode::Char('?') => AppEvent::ShowHelp,

            // View hotkeys are lowercase; uppercase letters are actions
            KeyCode::Char(c) if View::from_hotkey(c).is_some() => {
                View::from_hotkey(c).map_or(AppEvent::None, AppEvent::SwitchView)
            }

            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    AppEvent::PrevView
                } else {
                    AppEvent::NextView
                }
            }
            KeyCode::BackTab => AppEvent::PrevView,

            // List navigation
            KeyCode::Up | KeyCode::Char('k') => AppEvent::NavigateUp,
            KeyCode::Down | KeyCode::Char('j') => AppEvent::NavigateDown,
            KeyCode::PageUp => AppEvent::PageUp,
            KeyCode::PageDown => AppEvent::PageDown,
            KeyCode::Home => AppEvent::GoToTop,
            KeyCode::End | KeyCode::Char('G') => AppEvent::GoToBottom,

            KeyCode::Enter => AppEvent::Select,
            KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => AppEvent::Toggle,

            KeyCode::Char('R') => AppEvent::Refresh,
            KeyCode::Char('1') => AppEvent::SetRange(TimelineRange::Day),
            KeyCode::Char('2') => AppEvent::SetRange(TimelineRange::Week),
            KeyCode::Char('3') => AppEvent::SetRange(TimelineRange::Month),
            KeyCode::Char('f') => AppEvent::CycleFilter,
            KeyCode::Char('n') => AppEvent::CycleCount,
            KeyCode::Char('/') => {
                self.text_mode = true;
                AppEvent::StartSearch
            }
            KeyCode::Char('d') => AppEvent::Delete,
            KeyCode::Char('y') => AppEvent::Confirm,
            KeyCode::Char('b') => AppEvent::BlockIp,
            KeyCode::Char('u') => AppEvent::UnblockIp,
            KeyCode::Char('T') => AppEvent::ToggleTheme,

            _ => AppEvent::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn key_event_with_mods(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    #[test]
    fn test_view_hotkeys() {
        let mut handler = InputHandler::new();

        for view in View::ALL {
            let key = view.hotkey().unwrap();
            assert_eq!(
                handler.handle_key(key_event(KeyCode::Char(key))),
                AppEvent::SwitchView(view)
            );
        }
    }

    #[test]
    fn test_uppercase_letters_are_actions() {
        let mut handler = InputHandler::new();
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('R'))),
            AppEvent::Refresh
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('T'))),
            AppEvent::ToggleTheme
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('r'))),
            AppEvent::SwitchView(View::Rules)
        );
    }

    #[test]
    fn test_tab_cycling() {
        let mut handler = InputHandler::new();

        assert_eq!(
            handler.handle_key(key_event(KeyCode::Tab)),
            AppEvent::NextView
        );
        assert_eq!(
            handler.handle_key(key_event_with_mods(KeyCode::Tab, KeyModifiers::SHIFT)),
            AppEvent::PrevView
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::BackTab)),
            AppEvent::PrevView
        );
    }

    #[test]
    fn test_quit_keys() {
        let mut handler = InputHandler::new();

        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('q'))),
            AppEvent::Quit
        );
        assert_eq!(
            handler.handle_key(key_event_with_mods(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            AppEvent::ForceQuit
        );
    }

    #[test]
    fn test_action_keys() {
        let mut handler = InputHandler::new();

        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('2'))),
            AppEvent::SetRange(TimelineRange::Week)
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('f'))),
            AppEvent::CycleFilter
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('n'))),
            AppEvent::CycleCount
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('b'))),
            AppEvent::BlockIp
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('u'))),
            AppEvent::UnblockIp
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('d'))),
            AppEvent::Delete
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('y'))),
            AppEvent::Confirm
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Enter)),
            AppEvent::Select
        );
    }

    #[test]
    fn test_search_enters_text_mode() {
        let mut handler = InputHandler::new();

        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('/'))),
            AppEvent::StartSearch
        );
        assert!(handler.is_text_mode());

        // Hotkeys become text while typing.
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('q'))),
            AppEvent::TextInput('q')
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Backspace)),
            AppEvent::Backspace
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Enter)),
            AppEvent::Submit
        );
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Tab)),
            AppEvent::FocusNext
        );
    }

    #[test]
    fn test_escape_and_ctrl_c_in_text_mode() {
        let mut handler = InputHandler::new();
        handler.set_text_mode(true);

        assert_eq!(
            handler.handle_key(key_event(KeyCode::Esc)),
            AppEvent::Cancel
        );
        assert_eq!(
            handler.handle_key(key_event_with_mods(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            AppEvent::ForceQuit
        );
    }

    #[test]
    fn test_unknown_key() {
        let mut handler = InputHandler::new();
        assert_eq!(
            handler.handle_key(key_event(KeyCode::Char('x'))),
            AppEvent::None
        );
        assert_eq!(handler.handle_key(key_event(KeyCode::F(5))), AppEvent::None);
    }
}
