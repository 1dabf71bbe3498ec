//! Run-level processing shared by every adapter.
//!
//! - [`dedup`] - [`ContactDeduplicator`], one contact per `(platform, id)`
//! - [`output`] - contacts JSON array and messages JSON Lines writers
//! - [`processor`] - [`run_contacts`] / [`run_messages`] and [`RunStats`]

pub mod dedup;
pub mod output;
pub mod processor;

pub use dedup::ContactDeduplicator;
pub use output::{JsonlWriter, to_contacts_json, to_jsonl, write_contacts, write_messages};
pub use processor::{RunStats, run_contacts, run_messages};
