//! Telegram platform integration
//!
//! This module provides:
//! - Capability traits for the remote client (normal and takeout mode)
//! - Raw platform shapes as received from the wire layer
//! - Normalization of raw messages to domain models

mod client;
mod normalize;

pub use client::{ClientError, FetchPage, TakeoutClient, TelegramClient};
pub use normalize::{NormalizeError, normalize_message};

/// Raw platform shapes
///
/// These mirror the objects the wire layer hands over; the engine treats
/// them as opaque input and never constructs them itself outside of tests.
pub mod api {
    use serde::{Deserialize, Serialize};

    /// A raw message as received from the platform
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RawMessage {
        pub id: i64,
        /// Platform timestamp, epoch seconds
        pub date: i64,
        #[serde(default)]
        pub text: String,
        /// Empty-placeholder marker (deleted or inaccessible message)
        #[serde(default)]
        pub empty: bool,
        pub peer: Option<RawPeer>,
        pub sender: Option<RawSender>,
        pub sender_id: Option<i64>,
        pub media: Option<RawMedia>,
        pub reply_to: Option<RawReplyHeader>,
        pub fwd_from: Option<RawForwardHeader>,
    }

    impl RawMessage {
        /// Numeric id of the owning chat, if the peer variant is known
        pub fn chat_id(&self) -> Option<i64> {
            self.peer.as_ref().map(RawPeer::id)
        }
    }

    /// Peer reference attached to a message
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum RawPeer {
        User { user_id: i64 },
        Chat { chat_id: i64 },
        Channel { channel_id: i64 },
    }

    impl RawPeer {
        pub fn id(&self) -> i64 {
            match *self {
                RawPeer::User { user_id } => user_id,
                RawPeer::Chat { chat_id } => chat_id,
                RawPeer::Channel { channel_id } => channel_id,
            }
        }
    }

    /// Resolved sender entity of a message
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum RawSender {
        User(RawUser),
        /// Group or channel sender
        Chat(RawChat),
        /// Explicitly-empty sender placeholder
        Empty,
    }

    impl RawSender {
        pub fn id(&self) -> Option<i64> {
            match self {
                RawSender::User(user) => Some(user.id),
                RawSender::Chat(chat) => Some(chat.id),
                RawSender::Empty => None,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RawUser {
        pub id: i64,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub username: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RawChat {
        pub id: i64,
        pub title: Option<String>,
    }

    /// Attachment payload reference
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum RawMedia {
        Photo { id: i64 },
        Video { id: i64 },
        Audio { id: i64 },
        Document { id: i64, mime_type: Option<String> },
        Sticker { id: i64 },
        /// Anything the wire layer could not classify
        Unsupported,
    }

    impl RawMedia {
        /// Platform media identifier, when the variant carries one
        pub fn platform_id(&self) -> Option<i64> {
            match *self {
                RawMedia::Photo { id }
                | RawMedia::Video { id }
                | RawMedia::Audio { id }
                | RawMedia::Document { id, .. }
                | RawMedia::Sticker { id } => Some(id),
                RawMedia::Unsupported => None,
            }
        }
    }

    /// Reply header on a raw message
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RawReplyHeader {
        pub reply_to_msg_id: Option<i64>,
    }

    /// Forward header on a raw message
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RawForwardHeader {
        pub from_peer: Option<RawPeer>,
        pub channel_post: Option<i64>,
    }

    /// Summary returned by a history-head probe
    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct RawHistory {
        /// Total message count reported for the chat
        pub count: u32,
    }

    /// A raw conversation listing
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct RawDialog {
        pub id: Option<i64>,
        pub name: Option<String>,
        #[serde(default)]
        pub is_user: bool,
        #[serde(default)]
        pub is_group: bool,
        #[serde(default)]
        pub is_channel: bool,
        pub unread_count: Option<u32>,
        pub participants_count: Option<u32>,
        pub last_message: Option<String>,
        /// Epoch seconds of the last message, if any
        pub last_message_date: Option<i64>,
    }
}
