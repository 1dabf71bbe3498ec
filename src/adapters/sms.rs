//! Phone SMS dumps.
//!
//! The export root mixes three message layouts and one contact layout:
//!
//! - `*.txt` record dumps, parsed with the transcript machine:
//!
//!   ```text
//!   Received SMS.
//!   Id: 17
//!   Date: 29.12.2003 г. 21:40:05
//!   Numbers: 0888123456 <Ivan>
//!   See you at 8
//!   --------------------
//!   ```
//!
//! - `*.csv` message lists with a `Date;Number;Text` header.
//! - `*.xml` with `<MESSAGE><TELNUM/><DATE/><TEXT/></MESSAGE>` records.
//! - `*.csv` phone book exports without a header, number in the third column
//!   and name in the fourth.
//!
//! Every message is addressed to the archive owner (`-u`, required).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapter::{ContactStream, MessageStream, SourceAdapter, SourceFormat, discover_files, per_file, xml_document};
use crate::config::SourceOptions;
use crate::contact::{Contact, PlatformIdentity};
use crate::error::{ArchiveError, Result};
use crate::message::{Message, MessageTarget, Platform};
use crate::parsing::{
    FieldAction, FormatHint, LineClass, TextDecoder, TimestampNormalizer, TimestampPolicy, TranscriptEntry,
    TranscriptGrammar, TranscriptMachine,
};

const FORMAT: &str = "SMS";
const CSV_FORMAT: &str = "SMS CSV";
const XML_FORMAT: &str = "SMS XML";

const RECORD_START: &str = "Received SMS.";
const SEPARATOR: &str = "---";

/// One `Received SMS.` record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmsRecord {
    pub id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// Set once `Numbers:` has opened the body; later labels are body text.
    pub body_open: bool,
}

/// A labeled line inside a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsField {
    Id(String),
    Date(String),
    Numbers(String),
}

/// Line grammar for SMS text dumps.
#[derive(Debug, Clone, Copy)]
pub struct SmsGrammar<'a> {
    normalizer: &'a TimestampNormalizer,
}

impl<'a> SmsGrammar<'a> {
    pub fn new(normalizer: &'a TimestampNormalizer) -> Self {
        Self { normalizer }
    }
}

impl TranscriptGrammar for SmsGrammar<'_> {
    type Session = SmsRecord;
    type Field = SmsField;
    type Speaker = String;

    fn classify(&self, line: &str, _line_number: usize) -> Result<LineClass<SmsRecord, SmsField>> {
        if line.starts_with(RECORD_START) {
            return Ok(LineClass::Start(SmsRecord::default()));
        }
        if line.starts_with(SEPARATOR) {
            return Ok(LineClass::Close);
        }
        let field = if let Some(rest) = line.strip_prefix("Id:") {
            SmsField::Id(rest.trim().to_string())
        } else if let Some(rest) = line.strip_prefix("Date:") {
            SmsField::Date(rest.trim().to_string())
        } else if let Some(rest) = line.strip_prefix("Numbers:") {
            SmsField::Numbers(rest.trim().to_string())
        } else {
            return Ok(LineClass::Text);
        };
        Ok(LineClass::Field(field))
    }

    fn field(&self, record: &mut SmsRecord, field: SmsField, line_number: usize) -> Result<FieldAction<String>> {
        if record.body_open {
            return Ok(FieldAction::Text);
        }
        match field {
            SmsField::Id(id) => {
                record.id = Some(id);
                Ok(FieldAction::Header)
            }
            SmsField::Date(raw) => {
                record.date = Some(self.normalizer.normalize(&raw, FormatHint::Sms)?);
                Ok(FieldAction::Header)
            }
            SmsField::Numbers(raw) => {
                let number = sender_number(&raw);
                if number.is_empty() {
                    return Err(ArchiveError::malformed_header(line_number, format!("Numbers: {raw}")));
                }
                record.body_open = true;
                Ok(FieldAction::Open {
                    speaker: number.to_string(),
                    text: String::new(),
                })
            }
        }
    }

    fn anchor(&self, record: &SmsRecord) -> Option<DateTime<Utc>> {
        record.date
    }

    fn policy(&self) -> TimestampPolicy {
        TimestampPolicy::ExplicitPerRecord
    }
}

/// Strips a trailing `<Name>` from a `Numbers:` value.
pub fn sender_number(raw: &str) -> &str {
    match raw.split_once('<') {
        Some((number, _)) => number.trim(),
        None => raw.trim(),
    }
}

#[derive(Debug, Deserialize)]
struct CsvMessageRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Number")]
    number: String,
    #[serde(rename = "Text", default)]
    text: String,
}

/// Adapter for SMS export directories.
#[derive(Debug, Clone)]
pub struct SmsAdapter {
    options: SourceOptions,
    decoder: TextDecoder,
    normalizer: TimestampNormalizer,
}

impl SmsAdapter {
    pub fn new(options: SourceOptions) -> Result<Self> {
        Ok(Self {
            decoder: options.decoder()?,
            options,
            normalizer: TimestampNormalizer::default(),
        })
    }

    /// Parses a text record dump held in memory.
    pub fn parse_txt<'a>(&'a self, content: &str) -> Result<MessageStream<'a>> {
        let owner = self.options.require_owner("SMS recipient")?;
        Ok(self.txt_messages(owner, content))
    }

    fn txt_messages<'a>(&'a self, owner: &'a str, content: &str) -> MessageStream<'a> {
        let lines: Vec<String> = content.lines().map(str::to_owned).collect();
        Box::new(
            TranscriptMachine::new(SmsGrammar::new(&self.normalizer))
                .run(lines)
                .map(move |entry| entry.map(|e| record_message(owner, e))),
        )
    }

    /// Parses a `Date;Number;Text` message list. Files with any other
    /// header yield nothing.
    pub fn parse_csv(&self, owner: &str, content: &str, path: Option<&Path>) -> Vec<Result<Message>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(content.as_bytes());

        match reader.headers() {
            Ok(headers) if ["Date", "Number", "Text"].iter().all(|h| headers.iter().any(|x| x == *h)) => {}
            Ok(_) => {
                debug!(file = ?path, "not an SMS message list");
                return Vec::new();
            }
            Err(e) => return vec![Err(ArchiveError::csv_parse(CSV_FORMAT, e, path.map(Path::to_path_buf)))],
        }

        let mut out = Vec::new();
        for row in reader.deserialize::<CsvMessageRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    out.push(Err(ArchiveError::csv_parse(CSV_FORMAT, e, path.map(Path::to_path_buf))));
                    break;
                }
            };
            match self.normalizer.normalize(&row.date, FormatHint::Sms) {
                Ok(ts) => out.push(Ok(Message::new(
                    ts,
                    Platform::Sms,
                    row.number.trim(),
                    MessageTarget::user(owner),
                    row.text,
                ))),
                Err(e) => warn!(file = ?path, error = %e, "dropping record"),
            }
        }
        out
    }

    /// Parses an XML export of `MESSAGE` records. Records without a date are
    /// skipped.
    pub fn parse_xml(&self, owner: &str, content: &str, path: Option<&Path>) -> Result<Vec<Message>> {
        let doc = xml_document(content)
            .map_err(|e| ArchiveError::xml_parse(XML_FORMAT, e, path.map(Path::to_path_buf)))?;

        let mut out = Vec::new();
        for node in doc.root_element().children().filter(|n| n.has_tag_name("MESSAGE")) {
            let child = |name: &str| {
                node.children()
                    .find(|c| c.has_tag_name(name))
                    .and_then(|c| c.text())
                    .map(str::trim)
            };
            let Some(date) = child("DATE").filter(|d| !d.is_empty()) else {
                continue;
            };
            let from = child("TELNUM").unwrap_or_default();
            match self.normalizer.normalize(date, FormatHint::Sms) {
                Ok(ts) => out.push(Message::new(
                    ts,
                    Platform::Sms,
                    from,
                    MessageTarget::user(owner),
                    child("TEXT").unwrap_or_default(),
                )),
                Err(e) => warn!(file = ?path, error = %e, "dropping record"),
            }
        }
        Ok(out)
    }

    /// Parses a headerless `;`-separated phone book.
    pub fn parse_phone_book(&self, content: &str, path: Option<&Path>) -> Result<Vec<Contact>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut out = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ArchiveError::csv_parse(CSV_FORMAT, e, path.map(Path::to_path_buf)))?;
            let (Some(number), Some(name)) = (record.get(2), record.get(3)) else {
                continue;
            };
            let number = number.trim().trim_start_matches('\'');
            if number.is_empty() {
                continue;
            }
            let name = name.trim().trim_start_matches('\'').trim_end_matches('?');
            out.push(Contact::new(
                name,
                PlatformIdentity::new(number, Platform::Sms).with_display_name(name),
            ));
        }
        Ok(out)
    }

    fn files(&self, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        discover_files(self.options.require_root(FORMAT)?, extensions)
    }

    fn file_messages<'a>(&'a self, owner: &'a str, path: &Path) -> Result<MessageStream<'a>> {
        let content = self.decoder.read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        Ok(match ext.as_str() {
            "txt" => self.txt_messages(owner, &content),
            "csv" => Box::new(self.parse_csv(owner, &content, Some(path)).into_iter()),
            _ => Box::new(self.parse_xml(owner, &content, Some(path))?.into_iter().map(Ok)),
        })
    }
}

fn record_message(owner: &str, entry: TranscriptEntry<SmsRecord, String>) -> Message {
    let msg = Message::new(
        entry.ts,
        Platform::Sms,
        entry.speaker,
        MessageTarget::user(owner),
        entry.text.trim(),
    );
    let msg = match entry.session.id {
        Some(id) if !id.is_empty() => msg.with_meta("sms_id", id),
        _ => msg,
    };
    if entry.ts_fallback {
        msg.with_meta("ts_source", "wall_clock")
    } else {
        msg
    }
}

impl SourceAdapter for SmsAdapter {
    fn name(&self) -> &'static str {
        "SMS"
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Sms
    }

    fn contacts(&self) -> Result<ContactStream<'_>> {
        let files = self.files(&["csv"])?;
        Ok(per_file(files, move |path| {
            let content = self.decoder.read_to_string(path)?;
            Ok(self.parse_phone_book(&content, Some(path))?.into_iter().map(Ok))
        }))
    }

    fn messages(&self) -> Result<MessageStream<'_>> {
        let owner = self.options.require_owner("SMS recipient")?;
        let files = self.files(&["txt", "csv", "xml"])?;
        Ok(per_file(files, move |path| self.file_messages(owner, path)))
    }
}
