use std::time::{Duration, Instant};

pub const TOAST_LIFETIME: Duration = Duration::from_secs(3);

/// Fire-and-forget notification. Showing a new message restarts the timer.
#[derive(Debug, Clone, Default)]
pub struct Toast {
    message: String,
    shown_at: Option<Instant>,
}

impl Toast {
    pub fn show(&mut self, message: impl Into<String>) {
        self.show_at(message, Instant::now());
    }

    pub fn show_at(&mut self, message: impl Into<String>, now: Instant) {
        self.message = message.into();
        self.shown_at = Some(now);
    }

    pub fn visible_message(&self) -> Option<&str> {
        self.visible_message_at(Instant::now())
    }

    pub fn visible_message_at(&self, now: Instant) -> Option<&str> {
        let shown_at = self.shown_at?;
        (now.saturating_duration_since(shown_at) < TOAST_LIFETIME).then_some(self.message.as_str())
    }

    /// Returns true when a visible toast expired, so the caller knows to redraw.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.shown_at.is_some() && self.visible_message_at(now).is_none() {
            self.shown_at = None;
            self.message.clear();
            return true;
        }
        false
    }
}
