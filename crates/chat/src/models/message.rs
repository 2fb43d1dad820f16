//! Normalized message model
//!
//! A [`NormalizedMessage`] is the storage-ready representation handed to
//! consumers. It is built once per retrieval call and carries no reference
//! back to the session that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::telegram::api::RawMedia;

/// Platform tag carried by every normalized record
pub const PLATFORM: &str = "telegram";

/// Classification of a message by its primary content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Photo,
    Video,
    Audio,
    Document,
    Sticker,
    Other,
}

/// Attachment metadata bound to its owning message
///
/// The byte payload stays `None` until the media fetcher resolves it; the
/// engine never holds payloads longer than one fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Process-generated id of the owning message
    pub message_uuid: Uuid,
    /// Media type tag, resolved before any fetch
    pub kind: MessageKind,
    /// Platform-specific media identifier, if the platform exposes one
    pub platform_id: Option<String>,
    /// Raw platform media payload reference
    pub raw: Option<RawMedia>,
    /// Downloaded payload, populated only by the media fetcher
    pub bytes: Option<Vec<u8>>,
}

/// Reply metadata extracted from the raw message
///
/// `reply_to_name` needs a cross-entity lookup and is left `None` during
/// normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyInfo {
    pub is_reply: bool,
    pub reply_to_id: Option<String>,
    pub reply_to_name: Option<String>,
}

/// Forward-origin metadata extracted from the raw message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardInfo {
    pub is_forward: bool,
    pub from_chat_id: Option<String>,
    pub from_chat_name: Option<String>,
    pub from_message_id: Option<String>,
}

/// Embedding slots of fixed dimensionalities
///
/// Populated out-of-band by the embedding collaborator; always empty when a
/// message leaves the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageVectors {
    pub vector_1536: Option<Vec<f32>>,
    pub vector_1024: Option<Vec<f32>>,
    pub vector_768: Option<Vec<f32>>,
}

/// Canonical unit of synchronized data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Process-generated unique identifier
    pub uuid: Uuid,
    /// Source platform tag (always [`PLATFORM`] here)
    pub platform: String,
    /// Platform message id in string form; platform ids may exceed native
    /// integer precision
    pub platform_message_id: String,
    /// Owning chat id, empty when the peer variant is unrecognized
    pub chat_id: String,
    /// Sender identifier
    pub from_id: String,
    /// Resolved sender display name, never empty
    pub from_name: String,
    /// Raw text body, may be empty for pure-media messages
    pub content: String,
    /// Content classification used by the type filter
    pub kind: MessageKind,
    /// Attachment descriptors, at most one per message
    pub media: Vec<MediaDescriptor>,
    pub reply: ReplyInfo,
    pub forward: ForwardInfo,
    pub vectors: MessageVectors,
    /// Search tokens, populated by the tokenizer collaborator
    pub tokens: Vec<String>,
    /// Platform-assigned timestamp (epoch seconds), authoritative
    pub platform_timestamp: i64,
    /// Local timestamps owned by the storage layer, never set here
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_serialization() {
        let json = serde_json::to_string(&MessageKind::Photo).unwrap();
        assert_eq!(json, "\"photo\"");
        let kind: MessageKind = serde_json::from_str("\"document\"").unwrap();
        assert_eq!(kind, MessageKind::Document);
    }

    #[test]
    fn test_message_round_trip() {
        let msg = NormalizedMessage {
            uuid: Uuid::new_v4(),
            platform: PLATFORM.to_string(),
            platform_message_id: "42".to_string(),
            chat_id: "1001".to_string(),
            from_id: "7".to_string(),
            from_name: "Alice".to_string(),
            content: "hello".to_string(),
            kind: MessageKind::Text,
            media: Vec::new(),
            reply: ReplyInfo::default(),
            forward: ForwardInfo::default(),
            vectors: MessageVectors::default(),
            tokens: Vec::new(),
            platform_timestamp: 1_700_000_000,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        };

        let json = serde_json::to_string(&msg).unwrap();
        let back: NormalizedMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.uuid, msg.uuid);
        assert_eq!(back.platform_message_id, "42");
        assert_eq!(back.kind, MessageKind::Text);
        assert!(back.vectors.vector_1536.is_none());
    }
}
