//! Dialog listing and classification
//!
//! Resolves raw conversation entities into [`NormalizedDialog`] records.
//! Resolution failures are scoped to the single entity: it is dropped with
//! a warning and the rest of the batch goes through.

use chrono::DateTime;
use log::{debug, warn};

use crate::events::{Event, EventBus};
use crate::models::{DialogKind, NormalizedDialog};
use crate::sync::SyncError;
use crate::telegram::TelegramClient;
use crate::telegram::api::RawDialog;

/// Per-entity resolution failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    /// Capability flags match none of user/group/channel
    #[error("dialog matches no known kind")]
    UnknownKind,

    /// The entity carries no identifier
    #[error("dialog has no id")]
    MissingId,
}

/// Classify and normalize one raw dialog entity
///
/// The kind is exactly one of user/group/channel; an entity matching none
/// is an error, never forced into a default.
pub fn resolve_dialog(raw: &RawDialog) -> Result<NormalizedDialog, DialogError> {
    let kind = if raw.is_group {
        DialogKind::Group
    } else if raw.is_channel {
        DialogKind::Channel
    } else if raw.is_user {
        DialogKind::User
    } else {
        return Err(DialogError::UnknownKind);
    };

    let id = raw.id.ok_or(DialogError::MissingId)?;
    let name = raw
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| id.to_string());

    Ok(NormalizedDialog {
        id,
        name,
        kind,
        unread_count: raw.unread_count,
        message_count: raw.participants_count,
        last_message: raw.last_message.clone(),
        last_message_at: raw
            .last_message_date
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
    })
}

/// List and resolve the account's dialogs, publishing `dialog:data`
///
/// Entities that fail resolution are dropped with a warning; the batch
/// never aborts because of one entity.
pub fn fetch_dialogs(
    client: &dyn TelegramClient,
    bus: &EventBus,
) -> Result<Vec<NormalizedDialog>, SyncError> {
    let raw_dialogs = client.list_dialogs()?;

    let mut dialogs = Vec::with_capacity(raw_dialogs.len());
    for raw in &raw_dialogs {
        match resolve_dialog(raw) {
            Ok(dialog) => dialogs.push(dialog),
            Err(err) => warn!("dropping dialog {:?}: {err}", raw.id),
        }
    }

    debug!("fetched {} dialogs", dialogs.len());
    bus.publish(&Event::DialogData {
        dialogs: dialogs.clone(),
    });

    Ok(dialogs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_dialog(id: Option<i64>, kind: &str) -> RawDialog {
        RawDialog {
            id,
            name: Some(format!("dialog {id:?}")),
            is_user: kind == "user",
            is_group: kind == "group",
            is_channel: kind == "channel",
            unread_count: Some(2),
            participants_count: Some(40),
            last_message: Some("latest".to_string()),
            last_message_date: Some(1_700_000_000),
        }
    }

    #[test]
    fn test_resolve_kind_is_exclusive() {
        assert_eq!(
            resolve_dialog(&raw_dialog(Some(1), "user")).unwrap().kind,
            DialogKind::User
        );
        assert_eq!(
            resolve_dialog(&raw_dialog(Some(2), "group")).unwrap().kind,
            DialogKind::Group
        );
        assert_eq!(
            resolve_dialog(&raw_dialog(Some(3), "channel")).unwrap().kind,
            DialogKind::Channel
        );
        assert_eq!(
            resolve_dialog(&raw_dialog(Some(4), "none")),
            Err(DialogError::UnknownKind)
        );
    }

    #[test]
    fn test_resolve_requires_id() {
        assert_eq!(
            resolve_dialog(&raw_dialog(None, "user")),
            Err(DialogError::MissingId)
        );
    }

    #[test]
    fn test_name_falls_back_to_id() {
        let mut raw = raw_dialog(Some(42), "channel");
        raw.name = None;
        assert_eq!(resolve_dialog(&raw).unwrap().name, "42");

        raw.name = Some(String::new());
        assert_eq!(resolve_dialog(&raw).unwrap().name, "42");
    }

    #[test]
    fn test_optional_fields_carried_through() {
        let dialog = resolve_dialog(&raw_dialog(Some(5), "group")).unwrap();
        assert_eq!(dialog.unread_count, Some(2));
        assert_eq!(dialog.message_count, Some(40));
        assert_eq!(dialog.last_message.as_deref(), Some("latest"));
        assert!(dialog.last_message_at.is_some());
    }
}
