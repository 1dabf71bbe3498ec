//! Skype database dumps as JSON lines (`-f`).
//!
//! Each line is one message row: `author`, `dialog_partner`, `from_dispname`,
//! `body_xml` and an epoch `timestamp`. Rows are always one-to-one, so the
//! recipient is `dialog_partner` and no owner id is needed.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::adapter::{ContactStream, MessageStream, SourceAdapter, SourceFormat, json_lines};
use crate::config::SourceOptions;
use crate::contact::{Contact, PlatformIdentity};
use crate::error::Result;
use crate::message::{Message, MessageTarget, Platform};
use crate::parsing::{FormatHint, TextDecoder, TimestampNormalizer, strip_markup};

const FORMAT: &str = "Skype log JSONL";

#[derive(Debug, Deserialize)]
struct LogRow {
    author: Option<String>,
    dialog_partner: Option<String>,
    from_dispname: Option<String>,
    body_xml: Option<String>,
    timestamp: Option<Value>,
}

/// Adapter for Skype JSONL dumps.
#[derive(Debug, Clone)]
pub struct SkypeLogAdapter {
    options: SourceOptions,
    decoder: TextDecoder,
    normalizer: TimestampNormalizer,
}

impl SkypeLogAdapter {
    pub fn new(options: SourceOptions) -> Result<Self> {
        Ok(Self {
            decoder: options.decoder()?,
            options,
            normalizer: TimestampNormalizer::default(),
        })
    }

    fn rows(&self) -> Result<Vec<Result<LogRow>>> {
        let path = self.options.require_file(FORMAT)?;
        let content = self.decoder.read_to_string(path)?;
        Ok(json_lines(&content, FORMAT, Some(path)))
    }

    /// Parses a dump held in memory.
    pub fn parse_str(&self, content: &str) -> Vec<Result<Message>> {
        json_lines(content, FORMAT, None)
            .into_iter()
            .filter_map(|row| self.convert(row))
            .collect()
    }

    fn convert(&self, row: Result<LogRow>) -> Option<Result<Message>> {
        let row = match row {
            Ok(row) => row,
            Err(e) => return Some(Err(e)),
        };
        let (Some(from), Some(to)) = (row.author, row.dialog_partner) else {
            warn!("dropping record without author or dialog partner");
            return None;
        };

        let raw_ts = match row.timestamp {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                warn!(author = %from, "dropping record without timestamp");
                return None;
            }
        };
        let ts = match self.normalizer.normalize(&raw_ts, FormatHint::Epoch) {
            Ok(ts) => ts,
            Err(e) => {
                warn!(error = %e, "dropping record");
                return None;
            }
        };

        let raw = row.body_xml.unwrap_or_default();
        let text = strip_markup(&raw);
        let message = Message::new(ts, Platform::Skype, from, MessageTarget::user(to), text.clone());
        Some(Ok(if text == raw { message } else { message.with_raw(raw) }))
    }

    fn to_contact(row: Result<LogRow>) -> Option<Result<Contact>> {
        match row {
            Ok(LogRow {
                author: Some(author),
                from_dispname,
                ..
            }) => Some(Ok(Contact::from_identity(
                PlatformIdentity::new(author, Platform::Skype).with_display_name(from_dispname.unwrap_or_default()),
            ))),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl SourceAdapter for SkypeLogAdapter {
    fn name(&self) -> &'static str {
        "Skype log"
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::SkypeLog
    }

    fn contacts(&self) -> Result<ContactStream<'_>> {
        Ok(Box::new(self.rows()?.into_iter().filter_map(Self::to_contact)))
    }

    fn messages(&self) -> Result<MessageStream<'_>> {
        Ok(Box::new(self.rows()?.into_iter().filter_map(|row| self.convert(row))))
    }
}
