//! Message retrieval engine
//!
//! Pull-driven, dual-strategy paginated fetch with transparent
//! takeout-to-normal fallback.

mod session;

pub use session::{
    MessageStream, RetrievalOptions, Strategy, SyncError, fetch_history_head, retrieve_messages,
    send_message,
};
