use serde::{Deserialize, Serialize};

/// Conversational role a transcript message carries, and the role injected
/// content is attributed to when placed at a depth position.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    #[default]
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Decodes the numeric role code world-info entry extensions use.
    #[must_use]
    pub fn from_entry_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::System),
            1 => Some(Self::User),
            2 => Some(Self::Assistant),
            _ => None,
        }
    }

    #[must_use]
    pub fn entry_code(self) -> i32 {
        match self {
            Self::System => 0,
            Self::User => 1,
            Self::Assistant => 2,
        }
    }
}

/// One turn of the conversation transcript. The transcript is append-only
/// during a session; the engine only ever reads it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TranscriptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl TranscriptMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}
