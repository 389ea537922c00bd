//! Transient notifications.
//!
//! One toast is visible at a time; a new one replaces whatever is showing.
//! Toasts expire on their own after a fixed lifetime.

use std::time::{Duration, Instant};

/// Toast style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    pub fn icon(&self) -> &'static str {
        match self {
            ToastKind::Success => "✔",
            ToastKind::Error => "✖",
        }
    }
}

/// A single notification.
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

impl Toast {
    pub fn format(&self) -> String {
        format!("{} {}", self.kind.icon(), self.message)
    }
}

/// Holds the visible toast and expires it.
#[derive(Debug)]
pub struct ToastState {
    current: Option<Toast>,
    lifetime: Duration,
}

impl ToastState {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            current: None,
            lifetime,
        }
    }

    /// Show a toast, replacing the current one.
    pub fn show(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        let message = message.into();
        tracing::debug!(?kind, message = %message, "toast");
        self.current = Some(Toast {
            message,
            kind,
            shown_at: now,
        });
    }

    pub fn success(&mut self, message: impl Into<String>, now: Instant) {
        self.show(ToastKind::Success, message, now);
    }

    pub fn error(&mut self, message: impl Into<String>, now: Instant) {
        self.show(ToastKind::Error, message, now);
    }

    /// Drop the toast once its lifetime is over. Returns true if one expired.
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|t| now.saturating_duration_since(t.shown_at) >= self.lifetime);
        if expired {
            self.current = None;
        }
        expired
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

impl Default for ToastState {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_expires_after_lifetime() {
        let start = Instant::now();
        let mut toasts = ToastState::new(Duration::from_secs(3));
        toasts.success("IP 10.0.0.5 blocked successfully", start);

        assert!(!toasts.tick(start + Duration::from_millis(2999)));
        assert!(toasts.current().is_some());
        assert!(toasts.tick(start + Duration::from_secs(3)));
        assert!(toasts.current().is_none());
    }

    #[test]
    fn test_new_toast_replaces_and_restarts_timer() {
        let start = Instant::now();
        let mut toasts = ToastState::new(Duration::from_secs(3));
        toasts.success("first", start);
        toasts.error("second", start + Duration::from_secs(2));

        assert!(!toasts.tick(start + Duration::from_secs(4)));
        let toast = toasts.current().unwrap();
        assert_eq!(toast.message, "second");
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.format(), "✖ second");
    }
}
