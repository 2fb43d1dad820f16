//! Normalized dialog model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dialog classification, mutually exclusive and total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    User,
    Group,
    Channel,
}

/// A conversation entity (private chat, group, or channel)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDialog {
    pub id: i64,
    /// Display name, never empty; falls back to the id in string form
    pub name: String,
    pub kind: DialogKind,
    pub unread_count: Option<u32>,
    /// Participant or message count, whichever the platform reports
    pub message_count: Option<u32>,
    /// Text of the most recent message, if known
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}
