//! Integration tests for the retrieval engine
//!
//! Drives the session against mock clients and verifies pagination,
//! filtering, fallback, and termination behavior end to end.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chat::telegram::api::{RawDialog, RawHistory, RawMedia, RawMessage, RawPeer, RawSender, RawUser};
use chat::{
    ClientError, Event, EventBus, EventKind, FetchPage, MessageKind, NormalizedMessage,
    RetrievalOptions, Strategy, SyncError, TakeoutClient, TelegramClient, fetch_dialogs,
    fetch_history_head, retrieve_messages,
};

/// Mock normal-mode client fed with pre-baked pages
struct MockClient {
    batches: Mutex<VecDeque<Vec<RawMessage>>>,
    /// Every page request the session issued, for cursor assertions
    pages: Mutex<Vec<FetchPage>>,
    fetch_error: Option<ClientError>,
    dialogs: Vec<RawDialog>,
}

impl MockClient {
    fn new(batches: Vec<Vec<RawMessage>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            pages: Mutex::new(Vec::new()),
            fetch_error: None,
            dialogs: Vec::new(),
        }
    }

    fn failing(error: ClientError) -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            pages: Mutex::new(Vec::new()),
            fetch_error: Some(error),
            dialogs: Vec::new(),
        }
    }

    fn with_dialogs(dialogs: Vec<RawDialog>) -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            pages: Mutex::new(Vec::new()),
            fetch_error: None,
            dialogs,
        }
    }

    fn recorded_pages(&self) -> Vec<FetchPage> {
        self.pages.lock().unwrap().clone()
    }
}

impl TelegramClient for MockClient {
    fn fetch_batch(&self, _chat_id: i64, page: FetchPage) -> Result<Vec<RawMessage>, ClientError> {
        self.pages.lock().unwrap().push(page);
        if let Some(error) = &self.fetch_error {
            return Err(error.clone());
        }
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn fetch_history_head(&self, _chat_id: i64) -> Result<RawHistory, ClientError> {
        Ok(RawHistory { count: 1234 })
    }

    fn download_attachment(&self, _media: &RawMedia) -> Result<Option<Vec<u8>>, ClientError> {
        Ok(None)
    }

    fn list_dialogs(&self) -> Result<Vec<RawDialog>, ClientError> {
        Ok(self.dialogs.clone())
    }

    fn send(&self, _chat_id: i64, _text: &str) -> Result<(), ClientError> {
        Ok(())
    }

    fn me(&self) -> Result<i64, ClientError> {
        Ok(77)
    }
}

/// Takeout mock that always reports the given error
struct UnavailableTakeout {
    error: ClientError,
    calls: AtomicUsize,
}

impl UnavailableTakeout {
    fn not_available() -> Self {
        Self {
            error: ClientError::TakeoutNotAvailable,
            calls: AtomicUsize::new(0),
        }
    }
}

impl TakeoutClient for UnavailableTakeout {
    fn fetch_batch(&self, _chat_id: i64, _page: FetchPage) -> Result<Vec<RawMessage>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

fn make_raw(id: i64) -> RawMessage {
    RawMessage {
        id,
        date: 1_700_000_000 + id,
        text: format!("message {id}"),
        empty: false,
        peer: Some(RawPeer::Channel { channel_id: 1001 }),
        sender: Some(RawSender::User(RawUser {
            id: 7,
            first_name: Some("Alice".to_string()),
            last_name: None,
            username: None,
        })),
        sender_id: Some(7),
        media: None,
        reply_to: None,
        fwd_from: None,
    }
}

fn make_photo(id: i64) -> RawMessage {
    let mut raw = make_raw(id);
    raw.media = Some(RawMedia::Photo { id: 9000 + id });
    raw
}

/// Descending id range as one batch, newest first like the platform returns
fn batch(ids: std::ops::RangeInclusive<i64>) -> Vec<RawMessage> {
    ids.rev().map(make_raw).collect()
}

fn collect_ok(stream: impl Iterator<Item = Result<NormalizedMessage, SyncError>>) -> Vec<String> {
    stream
        .map(|item| item.expect("stream failed").platform_message_id)
        .collect()
}

#[test]
fn test_no_fetch_before_first_pull() {
    let client = MockClient::new(vec![batch(1..=100)]);
    let stream = retrieve_messages(&client, None, 1001, RetrievalOptions::default());
    drop(stream);
    assert!(client.recorded_pages().is_empty());
}

#[test]
fn test_pagination_cursor_tracks_minimum_seen_id() {
    // First page is full (100 messages), so the session keeps going
    let client = MockClient::new(vec![batch(201..=300), batch(198..=200)]);
    let ids = collect_ok(retrieve_messages(
        &client,
        None,
        1001,
        RetrievalOptions::default(),
    ));

    assert_eq!(ids.len(), 103);
    assert_eq!(ids.first().map(String::as_str), Some("300"));
    assert_eq!(ids.last().map(String::as_str), Some("198"));

    let pages = client.recorded_pages();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].offset_id, 0);
    // Cursor equals the minimum id observed in the previous page
    assert_eq!(pages[1].offset_id, 201);
}

#[test]
fn test_cursor_advances_past_filtered_messages() {
    // The whole first page is empty placeholders; the cursor must still
    // reach its minimum id
    let mut placeholders = batch(201..=300);
    for raw in &mut placeholders {
        raw.empty = true;
    }
    let client = MockClient::new(vec![placeholders, batch(199..=200)]);

    let ids = collect_ok(retrieve_messages(
        &client,
        None,
        1001,
        RetrievalOptions::default(),
    ));
    assert_eq!(ids, vec!["200", "199"]);

    let pages = client.recorded_pages();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1].offset_id, 201);
}

#[test]
fn test_min_id_stops_the_session() {
    let client = MockClient::new(vec![batch(1..=10)]);
    let options = RetrievalOptions {
        min_id: Some(5),
        ..Default::default()
    };

    let ids = collect_ok(retrieve_messages(&client, None, 1001, options));
    assert_eq!(ids, vec!["10", "9", "8", "7", "6"]);
    // One page was enough; the stop fires before a second request
    assert_eq!(client.recorded_pages().len(), 1);
}

#[test]
fn test_max_id_skips_but_keeps_traversing() {
    let client = MockClient::new(vec![batch(1..=10)]);
    let options = RetrievalOptions {
        max_id: Some(5),
        ..Default::default()
    };

    let ids = collect_ok(retrieve_messages(&client, None, 1001, options));
    assert_eq!(ids, vec!["4", "3", "2", "1"]);
}

#[test]
fn test_time_bounds() {
    // Dates are 1_700_000_000 + id
    let client = MockClient::new(vec![batch(1..=10)]);
    let start = chrono::DateTime::from_timestamp(1_700_000_004, 0).unwrap();
    let end = chrono::DateTime::from_timestamp(1_700_000_008, 0).unwrap();
    let options = RetrievalOptions {
        start_time: Some(start),
        end_time: Some(end),
        ..Default::default()
    };

    // 10 and 9 are after the end bound (skipped); 3 is before the start
    // bound and stops the session
    let ids = collect_ok(retrieve_messages(&client, None, 1001, options));
    assert_eq!(ids, vec!["8", "7", "6", "5", "4"]);
}

#[test]
fn test_unrepresentable_date_cannot_bypass_time_bounds() {
    let mut bad_date = make_raw(9);
    bad_date.date = i64::MAX;
    let client = MockClient::new(vec![vec![make_raw(10), bad_date, make_raw(8)]]);
    let options = RetrievalOptions {
        end_time: chrono::DateTime::from_timestamp(1_700_000_100, 0),
        ..Default::default()
    };

    let ids = collect_ok(retrieve_messages(&client, None, 1001, options));
    assert_eq!(ids, vec!["10", "8"]);
}

#[test]
fn test_limit_accounting() {
    let client = MockClient::new(vec![batch(1..=10)]);
    let options = RetrievalOptions {
        limit: Some(3),
        ..Default::default()
    };

    let ids = collect_ok(retrieve_messages(&client, None, 1001, options));
    assert_eq!(ids, vec!["10", "9", "8"]);

    // The request was capped to the remaining limit
    let pages = client.recorded_pages();
    assert_eq!(pages[0].limit, 3);
}

#[test]
fn test_starvation_guard_requests_another_batch() {
    // A full page where every message is filtered by type must trigger a
    // second request instead of ending the session
    let photos: Vec<RawMessage> = (201..=300).rev().map(make_photo).collect();
    let client = MockClient::new(vec![photos, batch(198..=200)]);
    let options = RetrievalOptions {
        kinds: Some(vec![MessageKind::Text]),
        ..Default::default()
    };

    let ids = collect_ok(retrieve_messages(&client, None, 1001, options));
    assert_eq!(ids, vec!["200", "199", "198"]);
    assert_eq!(client.recorded_pages().len(), 2);
}

#[test]
fn test_type_filter_uses_normalized_kind() {
    let mixed = vec![make_raw(10), make_photo(9), make_raw(8), make_photo(7)];
    let client = MockClient::new(vec![mixed]);
    let options = RetrievalOptions {
        kinds: Some(vec![MessageKind::Photo]),
        ..Default::default()
    };

    let ids = collect_ok(retrieve_messages(&client, None, 1001, options));
    assert_eq!(ids, vec!["9", "7"]);
}

#[test]
fn test_takeout_fallback_is_transparent() {
    let takeout = UnavailableTakeout::not_available();
    let with_fallback = MockClient::new(vec![batch(1..=10)]);
    let normal_only = MockClient::new(vec![batch(1..=10)]);

    let options = RetrievalOptions {
        strategy: Strategy::TakeoutPreferred,
        ..Default::default()
    };
    let fallback_ids = collect_ok(retrieve_messages(
        &with_fallback,
        Some(&takeout),
        1001,
        options,
    ));
    let normal_ids = collect_ok(retrieve_messages(
        &normal_only,
        None,
        1001,
        RetrievalOptions::default(),
    ));

    assert_eq!(fallback_ids, normal_ids);
    assert_eq!(takeout.calls.load(Ordering::SeqCst), 1);
    // The normal client served the same page the takeout attempt covered
    assert_eq!(with_fallback.recorded_pages()[0].offset_id, 0);
}

#[test]
fn test_takeout_fatal_error_terminates_with_failure() {
    let takeout = UnavailableTakeout {
        error: ClientError::Api {
            code: 420,
            message: "flood".to_string(),
        },
        calls: AtomicUsize::new(0),
    };
    let client = MockClient::new(vec![batch(1..=10)]);
    let options = RetrievalOptions {
        strategy: Strategy::TakeoutPreferred,
        ..Default::default()
    };

    let mut stream = retrieve_messages(&client, Some(&takeout), 1001, options);
    assert!(matches!(stream.next(), Some(Err(SyncError::Fetch { .. }))));
    assert!(stream.next().is_none());
    // Never fell back to the normal client
    assert!(client.recorded_pages().is_empty());
}

#[test]
fn test_failed_fetch_ends_stream_with_one_error() {
    let client = MockClient::failing(ClientError::Api {
        code: 400,
        message: "bad request".to_string(),
    });

    let mut stream = retrieve_messages(&client, None, 1001, RetrievalOptions::default());
    match stream.next() {
        Some(Err(SyncError::Fetch {
            attempts, source, ..
        })) => {
            // Client-side rejections are deterministic: no backoff spent
            assert_eq!(attempts, 1);
            assert!(matches!(source, ClientError::Api { code: 400, .. }));
        }
        other => panic!("expected a fetch failure, got {other:?}"),
    }
    assert!(stream.next().is_none());
}

#[test]
fn test_sender_failures_skip_without_aborting() {
    let mut no_sender = make_raw(9);
    no_sender.sender = Some(RawSender::Empty);
    no_sender.sender_id = None;
    let client = MockClient::new(vec![vec![make_raw(10), no_sender, make_raw(8)]]);
    let options = RetrievalOptions {
        limit: Some(5),
        ..Default::default()
    };

    // Ends normally: the limit was not reached but the source is exhausted
    let ids = collect_ok(retrieve_messages(&client, None, 1001, options));
    assert_eq!(ids, vec!["10", "8"]);
}

#[test]
fn test_early_consumer_exit_stops_fetching() {
    let client = MockClient::new(vec![batch(201..=300), batch(101..=200)]);
    let mut stream = retrieve_messages(&client, None, 1001, RetrievalOptions::default());

    for _ in 0..3 {
        assert!(stream.next().is_some());
    }
    drop(stream);

    // Only the first page was ever requested
    assert_eq!(client.recorded_pages().len(), 1);
}

#[test]
fn test_history_head_probe() {
    let client = MockClient::new(Vec::new());
    let history = fetch_history_head(&client, 1001).unwrap();
    assert_eq!(history.count, 1234);
}

#[test]
fn test_dialog_resolution_drops_only_bad_entities() {
    let make_dialog = |id: Option<i64>, kind: &str| RawDialog {
        id,
        name: Some(format!("dialog-{}", id.unwrap_or_default())),
        is_user: kind == "user",
        is_group: kind == "group",
        is_channel: kind == "channel",
        unread_count: Some(1),
        participants_count: None,
        last_message: None,
        last_message_date: None,
    };
    let client = MockClient::with_dialogs(vec![
        make_dialog(Some(1), "group"),
        make_dialog(Some(2), "channel"),
        make_dialog(Some(3), "user"),
        make_dialog(Some(4), "none"),
    ]);
    let bus = EventBus::new();

    let published = std::sync::Arc::new(Mutex::new(0usize));
    let sink = std::sync::Arc::clone(&published);
    bus.subscribe(EventKind::DialogData, move |event| {
        if let Event::DialogData { dialogs } = event {
            *sink.lock().unwrap() = dialogs.len();
        }
        Ok(())
    });

    let dialogs = fetch_dialogs(&client, &bus).unwrap();
    assert_eq!(dialogs.len(), 3);
    assert_eq!(dialogs[0].kind, chat::DialogKind::Group);
    assert_eq!(dialogs[1].kind, chat::DialogKind::Channel);
    assert_eq!(dialogs[2].kind, chat::DialogKind::User);
    assert_eq!(*published.lock().unwrap(), 3);
}
