//! Operator messages published on the controller's error channel.

use serde::{Deserialize, Serialize};

/// Type tag for operator error messages.
pub const OPERATOR_ERROR_TAG: u32 = 0x0B01;
/// Type tag for operator text messages.
pub const OPERATOR_TEXT_TAG: u32 = 0x0B02;
/// Type tag for operator display messages.
pub const OPERATOR_DISPLAY_TAG: u32 = 0x0B03;
/// Type tag for channel-level error reports.
pub const CHANNEL_ERROR_TAG: u32 = 0x0B11;
/// Type tag for channel-level text reports.
pub const CHANNEL_TEXT_TAG: u32 = 0x0B12;
/// Type tag for channel-level display reports.
pub const CHANNEL_DISPLAY_TAG: u32 = 0x0B13;

/// Kind of operator message; selects the slot it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Error,
    Text,
    Display,
}

impl MessageKind {
    /// Map a channel type tag to a message kind.
    ///
    /// Operator-level and channel-level tags of the same kind share a slot.
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            OPERATOR_ERROR_TAG | CHANNEL_ERROR_TAG => Some(Self::Error),
            OPERATOR_TEXT_TAG | CHANNEL_TEXT_TAG => Some(Self::Text),
            OPERATOR_DISPLAY_TAG | CHANNEL_DISPLAY_TAG => Some(Self::Display),
            _ => None,
        }
    }

    /// Operator-level tag for this kind.
    pub const fn tag(self) -> u32 {
        match self {
            Self::Error => OPERATOR_ERROR_TAG,
            Self::Text => OPERATOR_TEXT_TAG,
            Self::Display => OPERATOR_DISPLAY_TAG,
        }
    }
}

/// A message for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl OperatorMessage {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            text: text.into(),
        }
    }

    pub fn display(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Display,
            text: text.into(),
        }
    }
}
