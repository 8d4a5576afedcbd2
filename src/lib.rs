//! wastore - per-session WhatsApp Web store
//!
//! Consumes the event stream of a WhatsApp Web protocol session (history
//! snapshots, chat/contact/message upserts, updates, deletes, receipts and
//! reactions) and keeps a normalized, queryable copy of each session in
//! SQLite. Every change that lands is announced through a webhook sink.
//!
//! ## Quick Start
//!
//! ```bash
//! # Replay a captured event stream into the configured database
//! wastore replay --session S1 events.jsonl
//!
//! # Show what a session holds
//! wastore stats --session S1
//! ```

pub mod bus;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod proto;
pub mod store;
pub mod sync;
pub mod webhook;

// Re-export commonly used types
pub use bus::EventBus;
pub use error::StoreError;
pub use events::SyncEvent;
pub use store::SqlxStore;
pub use sync::SyncEngine;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
