//! Source adapters, one per export format.
//!
//! Each adapter implements [`SourceAdapter`](crate::adapter::SourceAdapter)
//! and is normally obtained through [`create_adapter`](crate::adapter::create_adapter).
//!
//! # Available Adapters
//!
//! - [`TrillianAdapter`] - Trillian session transcripts (`*.log`)
//! - [`SmsAdapter`] - SMS dumps (TXT records, CSV, XML) and phone books
//! - [`SkypeAdapter`] - Skype `messages.json` export and contacts CSV
//! - [`SkypeLogAdapter`] - Skype database dumps as JSON lines
//! - [`TelegramAdapter`] - Telegram JSONL history
//! - [`GoogleChatAdapter`] - Google Chat takeout groups
//! - [`KopeteAdapter`] - Kopete contact list and XML history
//!
//! The two transcript formats expose their line grammars ([`TrillianGrammar`],
//! [`SmsGrammar`]) so they can be driven directly through a
//! [`TranscriptMachine`](crate::parsing::TranscriptMachine).

mod google_chat;
mod kopete;
mod skype;
mod skypelog;
mod sms;
mod telegram;
mod trillian;

pub use google_chat::GoogleChatAdapter;
pub use kopete::KopeteAdapter;
pub use skype::{SkypeAdapter, strip_network_prefix};
pub use skypelog::SkypeLogAdapter;
pub use sms::{SmsAdapter, SmsField, SmsGrammar, SmsRecord, sender_number};
pub use telegram::TelegramAdapter;
pub use trillian::{Speaker, TrillianAdapter, TrillianGrammar, TrillianSession};
