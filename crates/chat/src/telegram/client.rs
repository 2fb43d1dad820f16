//! Remote client capability traits
//!
//! The engine never owns a wire protocol; it drives these traits and leaves
//! session establishment and transport to the implementor. All methods are
//! potentially slow and fallible, and the retried ones are wrapped by the
//! retry executor at the call site.

use super::api::{RawDialog, RawHistory, RawMedia, RawMessage};

/// Failure surface of the remote client
///
/// Raw platform errors never cross this boundary; implementors map them to
/// one of these variants before returning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Takeout session rejected by the platform
    #[error("takeout session not available")]
    TakeoutNotAvailable,

    /// Takeout session exists but needs a platform-imposed waiting period
    #[error("takeout session initialization delay")]
    TakeoutInitDelay,

    /// Transport-level failure (timeouts, connection resets)
    #[error("network error: {0}")]
    Network(String),

    /// Platform API rejection with its error code
    #[error("api error {code}: {message}")]
    Api { code: i32, message: String },
}

impl ClientError {
    /// Signals that the takeout strategy should fall back to normal fetch
    pub fn is_takeout_unavailable(&self) -> bool {
        matches!(
            self,
            ClientError::TakeoutNotAvailable | ClientError::TakeoutInitDelay
        )
    }

    /// Worth retrying with backoff: transport failures and server-side API
    /// errors. Client-side rejections and the takeout signals are
    /// deterministic and are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Api { code, .. } => *code >= 500,
            ClientError::TakeoutNotAvailable | ClientError::TakeoutInitDelay => false,
        }
    }
}

/// Page parameters for one batch request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchPage {
    /// Number of messages requested
    pub limit: usize,
    /// Cursor: fetch messages older than this id (0 = from the top)
    pub offset_id: i64,
    pub min_id: i64,
    pub max_id: i64,
}

/// Standard paginated fetch capability plus the auxiliary remote calls the
/// engine needs
pub trait TelegramClient: Send + Sync {
    /// Fetch one batch of raw messages for a chat
    fn fetch_batch(&self, chat_id: i64, page: FetchPage) -> Result<Vec<RawMessage>, ClientError>;

    /// One-message probe returning the chat's history summary
    fn fetch_history_head(&self, chat_id: i64) -> Result<RawHistory, ClientError>;

    /// Download an attachment payload; `None` when the platform returns
    /// nothing for the reference
    fn download_attachment(&self, media: &RawMedia) -> Result<Option<Vec<u8>>, ClientError>;

    /// List the account's conversations
    fn list_dialogs(&self) -> Result<Vec<RawDialog>, ClientError>;

    /// Send a text message
    fn send(&self, chat_id: i64, text: &str) -> Result<(), ClientError>;

    /// Numeric id of the authenticated account
    fn me(&self) -> Result<i64, ClientError>;
}

/// Bulk-export (takeout) variant of the batch fetch capability
///
/// Same shape as the normal fetch, but may signal
/// [`ClientError::TakeoutNotAvailable`] or [`ClientError::TakeoutInitDelay`],
/// which the retrieval session treats as a fallback trigger rather than a
/// terminal failure.
pub trait TakeoutClient: Send + Sync {
    fn fetch_batch(&self, chat_id: i64, page: FetchPage) -> Result<Vec<RawMessage>, ClientError>;
}
