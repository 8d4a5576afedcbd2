//! Protocol Payloads
//!
//! Value model and entity shapes produced by the messaging-protocol client.
//! Everything here is input: the sync handlers normalize it before storage.

mod jid;
mod types;
mod value;

pub use jid::normalized_user;
pub use types::{
    Chat, Contact, CredsUpdate, Me, MessageDelete, MessageKey, MessageUpdate, ReactionUpdate,
    ReceiptUpdate, WebMessage,
};
pub use value::{Long, ProtoObject, ProtoValue};
