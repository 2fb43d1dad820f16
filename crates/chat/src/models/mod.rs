//! Domain models for synchronized chat entities

mod dialog;
mod message;

pub use dialog::{DialogKind, NormalizedDialog};
pub use message::{
    ForwardInfo, MediaDescriptor, MessageKind, MessageVectors, NormalizedMessage, ReplyInfo,
    PLATFORM,
};
