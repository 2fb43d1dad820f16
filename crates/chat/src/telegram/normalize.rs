//! Raw message normalization
//!
//! Converts raw platform messages to [`NormalizedMessage`] records.
//! Normalization is synchronous and cheap: anything that would need another
//! remote call (forwarded-channel names, reply-author names, media payloads)
//! is left absent for downstream collaborators to fill in.

use uuid::Uuid;

use super::api::{RawMessage, RawPeer, RawSender};
use crate::models::{
    ForwardInfo, MediaDescriptor, MessageKind, MessageVectors, NormalizedMessage, PLATFORM,
    ReplyInfo,
};

/// Per-message normalization failure
///
/// Scoped to a single message; callers log and skip, never abort the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The message has no sender, or the sender is an empty placeholder.
    /// Such input never becomes a record with synthetic authorship.
    #[error("message {0} has no sender")]
    NoSender(i64),
}

/// Normalize one raw platform message
///
/// With `skip_media` set, the message kind is still classified but no media
/// descriptor is emitted, so media resolution is never requested downstream.
pub fn normalize_message(
    raw: &RawMessage,
    skip_media: bool,
) -> Result<NormalizedMessage, NormalizeError> {
    let sender = raw.sender.as_ref();
    if (sender.is_none() && raw.sender_id.is_none())
        || matches!(sender, Some(RawSender::Empty))
    {
        return Err(NormalizeError::NoSender(raw.id));
    }

    let uuid = Uuid::new_v4();
    let from_name = resolve_sender_name(sender, raw.sender_id);
    let from_id = raw
        .sender_id
        .or_else(|| sender.and_then(RawSender::id))
        .map(|id| id.to_string())
        .unwrap_or_default();

    // Unrecognized peer variants yield an empty chat id, not a failure;
    // callers may filter these downstream.
    let chat_id = raw
        .chat_id()
        .map(|id| id.to_string())
        .unwrap_or_default();

    let reply = match &raw.reply_to {
        Some(header) => ReplyInfo {
            is_reply: true,
            reply_to_id: header.reply_to_msg_id.map(|id| id.to_string()),
            // Needs a user lookup, resolved asynchronously elsewhere
            reply_to_name: None,
        },
        None => ReplyInfo::default(),
    };

    let forward = match &raw.fwd_from {
        Some(header) => ForwardInfo {
            is_forward: true,
            from_chat_id: match header.from_peer {
                Some(RawPeer::Channel { channel_id }) => Some(channel_id.to_string()),
                _ => None,
            },
            // Needs a channel lookup, resolved asynchronously elsewhere
            from_chat_name: None,
            from_message_id: header.channel_post.map(|id| id.to_string()),
        },
        None => ForwardInfo::default(),
    };

    let mut kind = MessageKind::Text;
    let mut media = Vec::new();
    if let Some(raw_media) = &raw.media {
        kind = media_kind(raw_media);
        if !skip_media {
            // Byte payload stays unresolved; the media fetcher owns that step
            media.push(MediaDescriptor {
                message_uuid: uuid,
                kind,
                platform_id: raw_media.platform_id().map(|id| id.to_string()),
                raw: Some(raw_media.clone()),
                bytes: None,
            });
        }
    }

    Ok(NormalizedMessage {
        uuid,
        platform: PLATFORM.to_string(),
        platform_message_id: raw.id.to_string(),
        chat_id,
        from_id,
        from_name,
        content: raw.text.clone(),
        kind,
        media,
        reply,
        forward,
        vectors: MessageVectors::default(),
        tokens: Vec::new(),
        platform_timestamp: raw.date,
        created_at: None,
        updated_at: None,
        deleted_at: None,
    })
}

/// Resolve a display name for the sender, never returning an empty string
///
/// Individual senders: non-empty given/family name parts joined by a single
/// space, then the handle, then the raw id. Group/channel senders: the
/// entity title, then the sender id.
fn resolve_sender_name(sender: Option<&RawSender>, sender_id: Option<i64>) -> String {
    let fallback_id = || {
        sender_id
            .or_else(|| sender.and_then(RawSender::id))
            .map(|id| id.to_string())
            .unwrap_or_default()
    };

    match sender {
        Some(RawSender::User(user)) => {
            let parts: Vec<&str> = [user.first_name.as_deref(), user.last_name.as_deref()]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .collect();
            if !parts.is_empty() {
                parts.join(" ")
            } else if let Some(username) = user.username.as_deref().filter(|u| !u.is_empty()) {
                username.to_string()
            } else {
                user.id.to_string()
            }
        }
        Some(RawSender::Chat(chat)) => chat
            .title
            .clone()
            .filter(|title| !title.is_empty())
            .unwrap_or_else(fallback_id),
        _ => fallback_id(),
    }
}

/// Map a raw media payload to its message kind
fn media_kind(media: &super::api::RawMedia) -> MessageKind {
    use super::api::RawMedia;
    match media {
        RawMedia::Photo { .. } => MessageKind::Photo,
        RawMedia::Video { .. } => MessageKind::Video,
        RawMedia::Audio { .. } => MessageKind::Audio,
        RawMedia::Document { .. } => MessageKind::Document,
        RawMedia::Sticker { .. } => MessageKind::Sticker,
        RawMedia::Unsupported => MessageKind::Other,
    }
}
