//! The source adapter contract and the adapter registry.
//!
//! Every supported export format implements [`SourceAdapter`]. Adapters are
//! selected once, by [`SourceFormat`], through [`create_adapter`]:
//!
//! ```rust,no_run
//! # fn main() -> chatarchive::Result<()> {
//! use chatarchive::adapter::{SourceFormat, create_adapter};
//! use chatarchive::config::SourceOptions;
//!
//! let options = SourceOptions::new().with_root("Google Chat/Groups/");
//! let adapter = create_adapter(SourceFormat::GoogleChat, options)?;
//!
//! for message in adapter.messages()? {
//!     match message {
//!         Ok(msg) => println!("{}: {}", msg.from, msg.text),
//!         Err(e) => eprintln!("skipped: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Streams
//!
//! Both operations return lazy streams of `Result`s. An `Err` item reports one
//! failed input file (or the failed remainder of one); the stream then moves
//! on to the next file. An `Err` from the operation itself means the export
//! could not be opened at all.
//!
//! Message streams are restartable: calling [`SourceAdapter::messages`] again
//! rereads the input and yields the same sequence.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::SourceOptions;
use crate::contact::Contact;
use crate::error::{ArchiveError, Result};
use crate::message::Message;

/// Lazy sequence of contact sightings.
pub type ContactStream<'a> = Box<dyn Iterator<Item = Result<Contact>> + 'a>;

/// Lazy sequence of messages, in per-file encounter order.
pub type MessageStream<'a> = Box<dyn Iterator<Item = Result<Message>> + 'a>;

/// Supported export formats.
///
/// # Example
///
/// ```rust
/// use chatarchive::adapter::SourceFormat;
/// use std::str::FromStr;
///
/// assert_eq!(SourceFormat::from_str("google-chat").unwrap(), SourceFormat::GoogleChat);
/// assert_eq!(SourceFormat::from_str("gchat").unwrap(), SourceFormat::GoogleChat);
/// assert_eq!(SourceFormat::Trillian.to_string(), "trillian");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// Trillian session transcripts (`ICQ/`, `IRC/`, `MSN/`, `YAHOO/`)
    Trillian,

    /// Phone SMS dumps (TXT records, CSV, XML)
    Sms,

    /// Skype `messages.json` export plus contacts CSV
    Skype,

    /// Skype database dump as JSON lines
    #[serde(rename = "skypelog", alias = "skype-log")]
    SkypeLog,

    /// Telegram JSON lines (telegram-history-dump)
    #[serde(alias = "tg")]
    Telegram,

    /// Google Takeout `Google Chat/Groups/`
    #[serde(alias = "gchat")]
    GoogleChat,

    /// Kopete contact list and XML history
    Kopete,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Trillian => "trillian",
            SourceFormat::Sms => "sms",
            SourceFormat::Skype => "skype",
            SourceFormat::SkypeLog => "skypelog",
            SourceFormat::Telegram => "telegram",
            SourceFormat::GoogleChat => "google-chat",
            SourceFormat::Kopete => "kopete",
        }
    }

    /// Returns all format names including aliases.
    pub fn all_names() -> &'static [&'static str] {
        &[
            "trillian",
            "sms",
            "skype",
            "skypelog",
            "skype-log",
            "telegram",
            "tg",
            "google-chat",
            "gchat",
            "kopete",
        ]
    }

    pub fn all() -> &'static [SourceFormat] {
        &[
            SourceFormat::Trillian,
            SourceFormat::Sms,
            SourceFormat::Skype,
            SourceFormat::SkypeLog,
            SourceFormat::Telegram,
            SourceFormat::GoogleChat,
            SourceFormat::Kopete,
        ]
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "trillian" => Ok(SourceFormat::Trillian),
            "sms" => Ok(SourceFormat::Sms),
            "skype" => Ok(SourceFormat::Skype),
            "skypelog" | "skype-log" => Ok(SourceFormat::SkypeLog),
            "telegram" | "tg" => Ok(SourceFormat::Telegram),
            "google-chat" | "googlechat" | "gchat" => Ok(SourceFormat::GoogleChat),
            "kopete" => Ok(SourceFormat::Kopete),
            _ => Err(format!(
                "Unknown source format: '{}'. Expected one of: {}",
                s,
                SourceFormat::all_names().join(", ")
            )),
        }
    }
}

/// Translates one export format into the canonical model.
///
/// Implementations only read their inputs. Owner resolution policy is per
/// adapter; see each adapter's module docs.
pub trait SourceAdapter {
    /// Human-readable adapter name.
    fn name(&self) -> &'static str;

    fn format(&self) -> SourceFormat;

    /// Streams every contact sighting, duplicates included.
    ///
    /// Feed the stream through [`ContactDeduplicator`](crate::core::ContactDeduplicator)
    /// to get one contact per identity.
    fn contacts(&self) -> Result<ContactStream<'_>>;

    /// Streams messages in encounter order.
    fn messages(&self) -> Result<MessageStream<'_>>;
}

/// Creates the adapter for `format`.
///
/// # Errors
///
/// Fails with [`ArchiveError::UnknownEncoding`](crate::ArchiveError::UnknownEncoding)
/// if the configured encoding label is not recognized.
pub fn create_adapter(format: SourceFormat, options: SourceOptions) -> Result<Box<dyn SourceAdapter>> {
    use crate::adapters::{
        GoogleChatAdapter, KopeteAdapter, SkypeAdapter, SkypeLogAdapter, SmsAdapter, TelegramAdapter,
        TrillianAdapter,
    };

    Ok(match format {
        SourceFormat::Trillian => Box::new(TrillianAdapter::new(options)?),
        SourceFormat::Sms => Box::new(SmsAdapter::new(options)?),
        SourceFormat::Skype => Box::new(SkypeAdapter::new(options)?),
        SourceFormat::SkypeLog => Box::new(SkypeLogAdapter::new(options)?),
        SourceFormat::Telegram => Box::new(TelegramAdapter::new(options)?),
        SourceFormat::GoogleChat => Box::new(GoogleChatAdapter::new(options)?),
        SourceFormat::Kopete => Box::new(KopeteAdapter::new(options)?),
    })
}

/// Lists files under `root` whose extension is one of `extensions`
/// (ASCII case-insensitive), depth-first with siblings sorted by name.
///
/// A missing or unreadable `root` is an error; unreadable entries below it
/// are logged and skipped.
pub(crate) fn discover_files(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if matches {
            files.push(entry.into_path());
        }
    }
    debug!(root = %root.display(), count = files.len(), "discovered input files");
    Ok(files)
}

/// Name of the directory directly under `root` that contains `path`.
pub(crate) fn top_level_dir<'p>(root: &Path, path: &'p Path) -> Option<&'p str> {
    let mut components = path.strip_prefix(root).ok()?.components();
    let first = components.next()?;
    // a file directly under root has no enclosing directory
    components.next()?;
    first.as_os_str().to_str()
}

/// Decodes one JSON record per line. Blank lines are skipped and a trailing
/// comma is tolerated, since some dump tools emit JSON arrays split by line.
///
/// A line that fails to parse is reported in place and the rest are still
/// decoded.
pub(crate) fn json_lines<T: DeserializeOwned>(
    content: &str,
    format: &'static str,
    path: Option<&Path>,
) -> Vec<Result<T>> {
    content
        .lines()
        .map(|line| line.trim().trim_end_matches(','))
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| ArchiveError::json_parse(format, e, path.map(Path::to_path_buf)))
        })
        .collect()
}

/// Parses an XML export. Desktop clients write a `<!DOCTYPE ...>` line at the
/// top of their files, so document type declarations are accepted.
pub(crate) fn xml_document(content: &str) -> std::result::Result<roxmltree::Document<'_>, roxmltree::Error> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(content, options)
}

/// Chains per-file streams, isolating failures.
///
/// `open` turns one path into a stream of items. If it fails, the error is
/// yielded as a single item and the next file is opened. Every error is
/// logged with the file it came from.
pub(crate) fn per_file<'a, T, I, F>(files: Vec<PathBuf>, mut open: F) -> Box<dyn Iterator<Item = Result<T>> + 'a>
where
    T: 'a,
    I: Iterator<Item = Result<T>> + 'a,
    F: FnMut(&Path) -> Result<I> + 'a,
{
    Box::new(files.into_iter().flat_map(move |path| {
        debug!(file = %path.display(), "reading");
        let items: Box<dyn Iterator<Item = Result<T>> + 'a> = match open(&path) {
            Ok(items) => Box::new(items),
            Err(e) => Box::new(std::iter::once(Err(e))),
        };
        items.inspect(move |item| {
            if let Err(e) = item {
                warn!(file = %path.display(), error = %e, "input failed");
            }
        })
    }))
}
