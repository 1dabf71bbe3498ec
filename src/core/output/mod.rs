//! Output writers.
//!
//! - [`write_contacts`] / [`to_contacts_json`] - contacts as one pretty-printed JSON array
//! - [`JsonlWriter`] / [`write_messages`] / [`to_jsonl`] - messages as JSON Lines
//!
//! Both formats are written to any [`std::io::Write`]; the CLI passes stdout.
//!
//! # Example
//!
//! ```rust
//! # fn main() -> chatarchive::Result<()> {
//! use chatarchive::core::output::to_jsonl;
//! use chatarchive::{Message, MessageTarget, Platform};
//! use chrono::{TimeZone, Utc};
//!
//! let ts = Utc.with_ymd_and_hms(2002, 1, 24, 21, 54, 39).unwrap();
//! let msg = Message::new(ts, Platform::Icq, "123456", MessageTarget::user("bob"), "Hi Bob");
//!
//! let jsonl = to_jsonl(&[msg])?;
//! assert!(jsonl.starts_with(r#"{"ts":"2002-01-24T21:54:39Z""#));
//! # Ok(())
//! # }
//! ```

mod json_writer;
mod jsonl_writer;

pub use json_writer::{to_contacts_json, write_contacts, write_contacts_file};
pub use jsonl_writer::{JsonlWriter, to_jsonl, write_messages};
