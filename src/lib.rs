//! # chatarchive
//!
//! Normalizes personal chat archive exports into one canonical model of
//! contacts and messages.
//!
//! ## Overview
//!
//! Supported exports:
//! - **Trillian** — `*.log` session transcripts per network (ICQ, IRC, MSN, Yahoo)
//! - **SMS** — phone dumps as TXT records, CSV or XML, plus phone book CSVs
//! - **Skype** — `messages.json` export with an optional contacts CSV, or a
//!   JSON-lines database dump
//! - **Telegram** — JSONL history dumps
//! - **Google Chat** — takeout `Groups/` directories
//! - **Kopete** — contact list XML and per-protocol XML history
//!
//! Every source is read through a [`SourceAdapter`] that yields two lazy
//! streams: contact sightings and messages. Contacts are deduplicated per
//! `(platform, id)` and written as one JSON array; messages are written as
//! JSON Lines in the order they are encountered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatarchive::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let options = SourceOptions::new()
//!         .with_root("Trillian/logs")
//!         .with_owner("000001");
//!     let adapter = create_adapter(SourceFormat::Trillian, options)?;
//!
//!     let stats = run_messages(adapter.as_ref(), std::io::stdout().lock())?;
//!     eprintln!("{} messages", stats.emitted);
//!     Ok(())
//! }
//! ```
//!
//! ## Transcripts
//!
//! Line-oriented formats (Trillian, SMS TXT) share one state machine,
//! [`TranscriptMachine`](parsing::TranscriptMachine), driven by a
//! per-format [`TranscriptGrammar`](parsing::TranscriptGrammar):
//!
//! ```rust
//! use chatarchive::adapters::TrillianGrammar;
//! use chatarchive::config::PlatformMap;
//! use chatarchive::parsing::{TimestampNormalizer, TranscriptMachine};
//!
//! let platforms = PlatformMap::trillian();
//! let normalizer = TimestampNormalizer::default();
//! let grammar = TrillianGrammar::new(&platforms, &normalizer, chrono::Duration::seconds(5));
//!
//! let log = "Session Start (ICQ - 000001:Alice): Thu Jan 24 21:54:39 2002\n\
//!            Alice: Hi Bob\n\
//!            What a nice day!\n\
//!            Session Close (Alice): Thu Jan 24 23:05:59 2002";
//!
//! let entries: Vec<_> = TranscriptMachine::new(grammar)
//!     .run(log.lines())
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(entries[0].text, "Hi Bob\nWhat a nice day!");
//! ```
//!
//! ## Module Structure
//!
//! - [`message`] / [`contact`] — canonical model
//! - [`parsing`] — timestamps, transcripts, markup, text decoding
//! - [`adapter`] — [`SourceAdapter`] trait, [`SourceFormat`], [`create_adapter`]
//! - [`adapters`] — one adapter per export format
//! - [`core`] — deduplication, output writers, run driver
//! - [`config`] — [`SourceOptions`](config::SourceOptions), [`PlatformMap`](config::PlatformMap)
//! - [`error`] — [`ArchiveError`], [`Result`]
//! - [`cli`] — command-line types (feature `cli`)

pub mod adapter;
pub mod adapters;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod contact;
pub mod core;
pub mod error;
pub mod message;
pub mod parsing;

// Re-export the main types at the crate root for convenience
pub use adapter::{SourceAdapter, SourceFormat, create_adapter};
pub use contact::{Contact, PlatformIdentity};
pub use error::{ArchiveError, Result};
pub use message::{Message, MessageTarget, Meta, MetaValue, Platform};

/// Convenient re-exports for common usage.
///
/// ```rust
/// use chatarchive::prelude::*;
/// ```
pub mod prelude {
    // Canonical model
    pub use crate::contact::{Contact, PlatformIdentity};
    pub use crate::message::{Message, MessageTarget, Meta, MetaValue, Platform};

    // Error types
    pub use crate::error::{ArchiveError, Result};

    // Adapters
    pub use crate::adapter::{SourceAdapter, SourceFormat, create_adapter};
    pub use crate::config::{PlatformMap, SourceOptions};

    // Parsing building blocks
    pub use crate::parsing::{FormatHint, TimestampNormalizer, strip_markup};

    // Run driver and output
    pub use crate::core::{ContactDeduplicator, RunStats, run_contacts, run_messages, to_contacts_json, to_jsonl};
}
