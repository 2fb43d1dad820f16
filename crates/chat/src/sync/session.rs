//! Paginated retrieval session
//!
//! One retrieval call produces one [`MessageStream`]: a forward-only,
//! non-restartable iterator over normalized messages. The stream is
//! pull-driven; no batch is requested until the consumer asks for the next
//! element, and a consumer that stops early stops the session with it.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::time::Duration;

use crate::models::{MessageKind, NormalizedMessage};
use crate::retry::{RetryPolicy, RetryResult, with_retry_if};
use crate::telegram::api::{RawHistory, RawMessage};
use crate::telegram::{ClientError, FetchPage, TakeoutClient, TelegramClient, normalize_message};

/// Fixed page size for batch requests, not caller-tunable
const BATCH_SIZE: usize = 100;

/// Retry budget for each remote fetch
const FETCH_RETRY: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(2));

/// Retrieval strategy requested by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Standard paginated fetch
    #[default]
    Normal,
    /// Try the bulk-export session first, fall back to normal fetch if the
    /// platform reports it unavailable or delayed
    TakeoutPreferred,
}

/// Filter and limit configuration for one retrieval call
///
/// Every field is optional; absence means unconstrained. Immutable for the
/// duration of the call.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOptions {
    pub strategy: Strategy,
    /// Maximum number of yielded messages
    pub limit: Option<usize>,
    /// Retrieval stops once ids reach this bound (the bound itself is
    /// excluded)
    pub min_id: Option<i64>,
    /// Ids at or above this bound are skipped, traversal continues past them
    pub max_id: Option<i64>,
    /// Retrieval stops at messages older than this instant
    pub start_time: Option<DateTime<Utc>>,
    /// Messages newer than this instant are skipped
    pub end_time: Option<DateTime<Utc>>,
    /// Allow-list of normalized message kinds
    pub kinds: Option<Vec<MessageKind>>,
    /// Classify media but emit no descriptors, so nothing downstream
    /// requests payload resolution
    pub skip_media: bool,
}

/// Fatal session failure
///
/// Yielded once as the final stream element; messages yielded before it
/// remain valid.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A retried remote fetch never succeeded
    #[error("{context} failed after {attempts} attempt(s): {source}")]
    Fetch {
        context: &'static str,
        attempts: u32,
        #[source]
        source: ClientError,
    },

    /// A non-retried remote call failed
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Active fetch mode; [`Strategy::TakeoutPreferred`] starts in takeout and
/// may transition to normal exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Takeout,
    Normal,
}

/// Outcome of visiting one raw message during pagination
enum Visit {
    Yield(Box<NormalizedMessage>),
    Skip,
    Stop,
}

/// Open a retrieval session for one chat
///
/// No remote call is made until the first element is pulled from the
/// returned stream.
pub fn retrieve_messages<'a>(
    client: &'a dyn TelegramClient,
    takeout: Option<&'a dyn TakeoutClient>,
    chat_id: i64,
    options: RetrievalOptions,
) -> MessageStream<'a> {
    let mode = match options.strategy {
        Strategy::TakeoutPreferred if takeout.is_some() => Mode::Takeout,
        Strategy::TakeoutPreferred => {
            warn!("takeout requested but no takeout client given, using normal fetch");
            Mode::Normal
        }
        Strategy::Normal => Mode::Normal,
    };

    MessageStream {
        client,
        takeout,
        chat_id,
        options,
        mode,
        offset_id: 0,
        yielded: 0,
        no_more: false,
        failed: false,
        buffer: Vec::new().into_iter(),
    }
}

/// One-shot stream of normalized messages for a single chat
///
/// Yields `Ok` items in the order the platform returned them; a fatal
/// failure appears as one final `Err` item, after which the stream ends.
pub struct MessageStream<'a> {
    client: &'a dyn TelegramClient,
    takeout: Option<&'a dyn TakeoutClient>,
    chat_id: i64,
    options: RetrievalOptions,
    mode: Mode,
    /// Pagination cursor: the lowest message id seen so far
    offset_id: i64,
    yielded: usize,
    no_more: bool,
    failed: bool,
    buffer: std::vec::IntoIter<RawMessage>,
}

impl MessageStream<'_> {
    /// Size of the next page request, capped by the remaining element limit
    fn request_limit(&self) -> usize {
        match self.options.limit {
            Some(limit) => BATCH_SIZE.min(limit - self.yielded),
            None => BATCH_SIZE,
        }
    }

    /// Apply the filter pipeline to one visited message
    ///
    /// The cursor advances for every visited message, filtered or not, so
    /// pagination never depends on which messages pass.
    fn visit(&mut self, raw: RawMessage) -> Visit {
        self.offset_id = raw.id;

        if let Some(max_id) = self.options.max_id
            && raw.id >= max_id
        {
            return Visit::Skip;
        }
        if let Some(min_id) = self.options.min_id
            && raw.id <= min_id
        {
            return Visit::Stop;
        }
        if raw.empty {
            return Visit::Skip;
        }

        if self.options.start_time.is_some() || self.options.end_time.is_some() {
            let Some(timestamp) = DateTime::from_timestamp(raw.date, 0) else {
                // An unrepresentable date must not slip past a time bound
                warn!(
                    "message {} carries unrepresentable date {}, skipping",
                    raw.id, raw.date
                );
                return Visit::Skip;
            };
            if let Some(start) = self.options.start_time
                && timestamp < start
            {
                return Visit::Stop;
            }
            if let Some(end) = self.options.end_time
                && timestamp > end
            {
                return Visit::Skip;
            }
        }

        match normalize_message(&raw, self.options.skip_media) {
            Ok(message) => {
                if let Some(kinds) = &self.options.kinds
                    && !kinds.contains(&message.kind)
                {
                    return Visit::Skip;
                }
                Visit::Yield(Box::new(message))
            }
            Err(err) => {
                // Scoped to this message; the session continues
                warn!("skipping message {}: {err}", raw.id);
                Visit::Skip
            }
        }
    }

    /// Request the next page under the active mode, falling back from
    /// takeout to normal on the distinguished unavailability signals
    ///
    /// The fallback reuses the current cursor, so the caller observes one
    /// continuous stream.
    fn fetch_next_batch(&mut self) -> Result<Vec<RawMessage>, SyncError> {
        let chat_id = self.chat_id;
        let page = FetchPage {
            limit: self.request_limit(),
            offset_id: self.offset_id,
            min_id: self.options.min_id.unwrap_or(0),
            max_id: self.options.max_id.unwrap_or(0),
        };

        loop {
            debug!(
                "fetching batch: chat={} offset_id={} limit={} mode={:?}",
                chat_id, page.offset_id, page.limit, self.mode
            );

            let takeout = match (self.mode, self.takeout) {
                (Mode::Takeout, Some(takeout)) => Some(takeout),
                _ => None,
            };

            if let Some(takeout) = takeout {
                let RetryResult { attempts, outcome } = with_retry_if(
                    FETCH_RETRY,
                    "takeout batch fetch",
                    || takeout.fetch_batch(chat_id, page),
                    ClientError::is_transient,
                );
                match outcome {
                    Ok(batch) => return Ok(batch),
                    Err(source) if source.is_takeout_unavailable() => {
                        warn!("takeout session not available, using normal message fetch");
                        self.mode = Mode::Normal;
                        continue;
                    }
                    Err(source) => {
                        return Err(SyncError::Fetch {
                            context: "takeout batch fetch",
                            attempts,
                            source,
                        });
                    }
                }
            }

            let client = self.client;
            let RetryResult { attempts, outcome } = with_retry_if(
                FETCH_RETRY,
                "message batch fetch",
                || client.fetch_batch(chat_id, page),
                ClientError::is_transient,
            );
            return outcome.map_err(|source| SyncError::Fetch {
                context: "message batch fetch",
                attempts,
                source,
            });
        }
    }
}

impl Iterator for MessageStream<'_> {
    type Item = Result<NormalizedMessage, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(limit) = self.options.limit
            && self.yielded >= limit
        {
            return None;
        }

        loop {
            while let Some(raw) = self.buffer.next() {
                match self.visit(raw) {
                    Visit::Yield(message) => {
                        self.yielded += 1;
                        return Some(Ok(*message));
                    }
                    Visit::Skip => {}
                    Visit::Stop => {
                        self.no_more = true;
                        self.buffer = Vec::new().into_iter();
                        return None;
                    }
                }
            }

            if self.no_more {
                return None;
            }

            // A drained batch with zero yields lands back here and fetches
            // again, so a long run of filtered-out messages cannot end the
            // session early.
            let requested = self.request_limit();
            match self.fetch_next_batch() {
                Ok(batch) => {
                    if batch.len() < requested {
                        // Short or empty page: the source is exhausted once
                        // this batch is processed
                        self.no_more = true;
                    }
                    self.buffer = batch.into_iter();
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Probe a chat's history summary (total message count)
pub fn fetch_history_head(
    client: &dyn TelegramClient,
    chat_id: i64,
) -> Result<RawHistory, SyncError> {
    let RetryResult { attempts, outcome } = with_retry_if(
        FETCH_RETRY,
        "history head fetch",
        || client.fetch_history_head(chat_id),
        ClientError::is_transient,
    );
    outcome.map_err(|source| SyncError::Fetch {
        context: "history head fetch",
        attempts,
        source,
    })
}

/// Send a text message to a chat
pub fn send_message(
    client: &dyn TelegramClient,
    chat_id: i64,
    text: &str,
) -> Result<(), SyncError> {
    client.send(chat_id, text)?;
    debug!("sent message to chat {chat_id}");
    Ok(())
}
