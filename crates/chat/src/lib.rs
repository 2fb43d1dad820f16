//! Chat crate - Message synchronization engine
//!
//! Pulls a user's message history from Telegram and normalizes it into a
//! stable, storage-ready representation for downstream indexing and media
//! archival. This crate provides:
//! - Domain models (NormalizedMessage, NormalizedDialog, MediaDescriptor)
//! - Remote client capability traits and raw platform shapes
//! - A pull-driven retrieval session with dual-strategy pagination and
//!   transparent takeout fallback
//! - Bounded-retry execution for remote calls
//! - Attachment download and archival
//! - A typed in-process event bus connecting the engine to its consumers
//!
//! Persistence, search indexing, embedding and tokenization are external
//! collaborators reached through the event bus; this crate never owns
//! their implementation.

pub mod config;
pub mod dialogs;
pub mod events;
pub mod media;
pub mod models;
pub mod retry;
pub mod sync;
pub mod telegram;

pub use config::{StorageConfig, TelegramCredentials, config_dir};
pub use dialogs::{DialogError, fetch_dialogs, resolve_dialog};
pub use events::{Event, EventBus, EventKind};
pub use media::{MediaFetcher, register_media_handlers};
pub use models::{
    DialogKind, ForwardInfo, MediaDescriptor, MessageKind, MessageVectors, NormalizedDialog,
    NormalizedMessage, ReplyInfo,
};
pub use retry::{RetryPolicy, RetryResult, with_retry, with_retry_if};
pub use sync::{
    MessageStream, RetrievalOptions, Strategy, SyncError, fetch_history_head, retrieve_messages,
    send_message,
};
pub use telegram::{
    ClientError, FetchPage, NormalizeError, TakeoutClient, TelegramClient, normalize_message,
};
