//! Attachment download and archival
//!
//! Downloads binary payloads for messages that carry media and persists
//! them under a per-user, per-chat content directory. Downloads within one
//! batch proceed independently; no ordering is guaranteed between them and
//! no de-duplication is performed for resubmitted messages.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, warn};
use rayon::prelude::*;

use crate::events::{Event, EventBus, EventKind};
use crate::telegram::TelegramClient;
use crate::telegram::api::RawMessage;

/// Downloads and archives message attachments
pub struct MediaFetcher {
    root: PathBuf,
}

impl MediaFetcher {
    /// Create a fetcher rooted at `<storage_root>/media`
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            root: storage_root.into().join("media"),
        }
    }

    /// Content directory for one user/chat pair, created lazily
    ///
    /// Creation is idempotent; overlapping fetch calls may both create it
    /// and "already exists" is not an error.
    fn chat_dir(&self, user_id: i64, chat_id: i64) -> Result<PathBuf> {
        let dir = self
            .root
            .join(user_id.to_string())
            .join(chat_id.to_string());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create media directory: {}", dir.display()))?;
        Ok(dir)
    }

    /// Download attachments for a batch of raw messages
    ///
    /// For each message carrying media: download the payload, start a
    /// fire-and-forget disk write when bytes came back, and publish a
    /// `media:data` completion event (with `bytes: None` when the download
    /// failed or returned nothing). Messages without media are ignored.
    pub fn fetch_media(&self, client: &dyn TelegramClient, messages: &[RawMessage], bus: &EventBus) {
        let user_id = match client.me() {
            Ok(id) => id,
            Err(err) => {
                error!("cannot resolve own account for media storage: {err}");
                return;
            }
        };

        messages.par_iter().for_each(|message| {
            let Some(media) = &message.media else {
                return;
            };
            let Some(chat_id) = message.chat_id() else {
                warn!("message {} has no resolvable chat, skipping media", message.id);
                return;
            };

            let dir = match self.chat_dir(user_id, chat_id) {
                Ok(dir) => dir,
                Err(err) => {
                    error!("media directory for chat {chat_id}: {err:#}");
                    return;
                }
            };

            let bytes = match client.download_attachment(media) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("download failed for message {}: {err}", message.id);
                    None
                }
            };

            let path = dir.join(message.id.to_string());
            if let Some(data) = &bytes {
                debug!(
                    "writing {} bytes of media for message {} to {}",
                    data.len(),
                    message.id,
                    path.display()
                );
                let data = data.clone();
                let target = path.clone();
                // Fire-and-forget: completion is reported without waiting
                // for the write
                std::thread::spawn(move || {
                    if let Err(err) = std::fs::write(&target, &data) {
                        error!("failed to write media {}: {err}", target.display());
                    }
                });
            }

            bus.publish(&Event::MediaData {
                message: message.clone(),
                path,
                bytes,
            });
        });
    }
}

/// Wire the fetcher to the bus: `media:fetch` requests trigger downloads,
/// completions come back as `media:data`
pub fn register_media_handlers(
    bus: &Arc<EventBus>,
    fetcher: Arc<MediaFetcher>,
    client: Arc<dyn TelegramClient>,
) {
    let bus_ref = Arc::downgrade(bus);
    bus.subscribe(EventKind::MediaFetch, move |event| {
        if let Event::MediaFetch { messages } = event
            && let Some(bus) = bus_ref.upgrade()
        {
            debug!("media fetch requested for {} messages", messages.len());
            fetcher.fetch_media(client.as_ref(), messages, &bus);
        }
        Ok(())
    });
}
