//! Latest-message slots for operator messages.
//!
//! Each kind keeps only its newest message. Several messages of the same
//! kind arriving between two polls collapse into the last one.

use copilot_common::message::{MessageKind, OperatorMessage};

/// Error, text and display slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorMessages {
    error: Option<String>,
    text: Option<String>,
    display: Option<String>,
}

impl OperatorMessages {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, kind: MessageKind) -> &mut Option<String> {
        match kind {
            MessageKind::Error => &mut self.error,
            MessageKind::Text => &mut self.text,
            MessageKind::Display => &mut self.display,
        }
    }

    /// Overwrite the slot for `message.kind`.
    pub fn store(&mut self, message: OperatorMessage) {
        *self.slot_mut(message.kind) = Some(message.text);
    }

    pub fn get(&self, kind: MessageKind) -> Option<&str> {
        match kind {
            MessageKind::Error => self.error.as_deref(),
            MessageKind::Text => self.text.as_deref(),
            MessageKind::Display => self.display.as_deref(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// Read and clear one slot.
    pub fn take(&mut self, kind: MessageKind) -> Option<String> {
        self.slot_mut(kind).take()
    }

    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    pub fn take_text(&mut self) -> Option<String> {
        self.text.take()
    }

    pub fn take_display(&mut self) -> Option<String> {
        self.display.take()
    }

    /// Move every filled slot of `newer` over this one.
    pub fn merge(&mut self, newer: OperatorMessages) {
        let OperatorMessages {
            error,
            text,
            display,
        } = newer;
        if error.is_some() {
            self.error = error;
        }
        if text.is_some() {
            self.text = text;
        }
        if display.is_some() {
            self.display = display;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.text.is_none() && self.display.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_message_wins() {
        let mut m = OperatorMessages::new();
        m.store(OperatorMessage::error("first"));
        m.store(OperatorMessage::error("second"));
        m.store(OperatorMessage::text("hello"));
        assert_eq!(m.error(), Some("second"));
        assert_eq!(m.text(), Some("hello"));
        assert_eq!(m.display(), None);
    }

    #[test]
    fn take_clears_only_its_slot() {
        let mut m = OperatorMessages::new();
        m.store(OperatorMessage::error("e"));
        m.store(OperatorMessage::display("d"));
        assert_eq!(m.take_error().as_deref(), Some("e"));
        assert_eq!(m.take_error(), None);
        assert_eq!(m.get(MessageKind::Display), Some("d"));
        assert_eq!(m.take(MessageKind::Display).as_deref(), Some("d"));
        assert!(m.is_empty());
    }

    #[test]
    fn merge_keeps_unset_slots() {
        let mut old = OperatorMessages::new();
        old.store(OperatorMessage::error("old error"));
        old.store(OperatorMessage::text("old text"));

        let mut newer = OperatorMessages::new();
        newer.store(OperatorMessage::text("new text"));

        old.merge(newer);
        assert_eq!(old.error(), Some("old error"));
        assert_eq!(old.text(), Some("new text"));
    }
}
