//! KDE Kopete: a contact list XML (`-f`) and a history tree (`-d`).
//!
//! History files live under one directory per protocol plugin and look like:
//!
//! ```xml
//! <kopete-history version="0.9">
//!   <head>
//!     <date year="2009" month="11"/>
//!     <contact contactId="me@jabber.org" type="myself"/>
//!     <contact contactId="friend@jabber.org"/>
//!   </head>
//!   <msg in="1" from="friend@jabber.org" time="20 20:9:48">hello</msg>
//! </kopete-history>
//! ```
//!
//! Each message only carries the day and time; year and month come from the head.

use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::adapter::{
    ContactStream, MessageStream, SourceAdapter, SourceFormat, discover_files, per_file, top_level_dir, xml_document,
};
use crate::config::{PlatformMap, SourceOptions};
use crate::contact::{Contact, PlatformIdentity};
use crate::error::{ArchiveError, Result};
use crate::message::{Message, MessageTarget, Platform};
use crate::parsing::{FormatHint, TextDecoder, TimestampNormalizer};

const CONTACTS_FORMAT: &str = "Kopete contact list";
const HISTORY_FORMAT: &str = "Kopete history";

/// Participants named in a history file's head.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HistoryHead {
    year: i32,
    month: u32,
    myself: String,
    other: String,
}

impl HistoryHead {
    fn read(doc: &Document<'_>) -> Result<Self> {
        let root = doc.root_element();
        let head = child(root, "head").ok_or_else(|| ArchiveError::invalid_format(HISTORY_FORMAT, "missing <head>"))?;

        let date = child(head, "date").ok_or_else(|| ArchiveError::invalid_format(HISTORY_FORMAT, "missing <date>"))?;
        let number = |attr: &str| -> Result<u32> {
            date.attribute(attr)
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| ArchiveError::invalid_format(HISTORY_FORMAT, format!("bad date {attr}")))
        };
        let year = i32::try_from(number("year")?)
            .map_err(|_| ArchiveError::invalid_format(HISTORY_FORMAT, "bad date year"))?;
        let month = number("month")?;

        let contacts: Vec<_> = head.children().filter(|n| n.has_tag_name("contact")).collect();
        let myself = contacts
            .iter()
            .find(|c| c.attribute("type") == Some("myself"))
            .and_then(|c| c.attribute("contactId"))
            .ok_or_else(|| ArchiveError::unresolved("myself", "Kopete history head"))?;
        let other = contacts
            .iter()
            .filter_map(|c| c.attribute("contactId"))
            .find(|id| *id != myself)
            .ok_or_else(|| ArchiveError::unresolved("counterpart", "Kopete history head"))?;

        Ok(Self {
            year,
            month,
            myself: myself.to_string(),
            other: other.to_string(),
        })
    }
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Adapter for Kopete contact lists and message history.
#[derive(Debug, Clone)]
pub struct KopeteAdapter {
    options: SourceOptions,
    decoder: TextDecoder,
    platforms: PlatformMap,
    normalizer: TimestampNormalizer,
}

impl KopeteAdapter {
    pub fn new(options: SourceOptions) -> Result<Self> {
        Ok(Self {
            decoder: options.decoder()?,
            options,
            platforms: PlatformMap::kopete(),
            normalizer: TimestampNormalizer::default(),
        })
    }

    /// Replaces the plugin id → platform table.
    #[must_use]
    pub fn with_platforms(mut self, platforms: PlatformMap) -> Self {
        self.platforms = platforms;
        self
    }

    /// Parses a contact list. Meta-contacts of unknown plugins are skipped.
    pub fn parse_contacts(&self, content: &str, path: Option<&Path>) -> Result<Vec<Contact>> {
        let doc = xml_document(content)
            .map_err(|e| ArchiveError::xml_parse(CONTACTS_FORMAT, e, path.map(Path::to_path_buf)))?;

        let mut out = Vec::new();
        for meta_contact in doc.root_element().children().filter(|n| n.has_tag_name("meta-contact")) {
            let Some(plugin) = child(meta_contact, "plugin-data") else {
                continue;
            };
            let plugin_id = plugin.attribute("plugin-id").unwrap_or_default();
            let Some(platform) = self.platforms.get(plugin_id) else {
                warn!(plugin = plugin_id, "skipping contact of unknown protocol");
                continue;
            };

            let field = |key: &str| {
                plugin
                    .children()
                    .filter(|n| n.has_tag_name("plugin-data-field"))
                    .find(|n| n.attribute("key") == Some(key))
                    .and_then(|n| n.text())
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
            };
            let Some(id) = field("accountId") else {
                warn!(plugin = plugin_id, "skipping contact without accountId");
                continue;
            };
            let name = field("displayName").unwrap_or(id);
            out.push(Contact::from_identity(
                PlatformIdentity::new(id, platform).with_display_name(name),
            ));
        }
        Ok(out)
    }

    /// Parses one history file recorded on `platform`.
    pub fn parse_history(&self, platform: Platform, content: &str, path: Option<&Path>) -> Result<Vec<Message>> {
        let doc = xml_document(content)
            .map_err(|e| ArchiveError::xml_parse(HISTORY_FORMAT, e, path.map(Path::to_path_buf)))?;
        let head = HistoryHead::read(&doc)?;

        let mut out = Vec::new();
        for msg in doc.root_element().children().filter(|n| n.has_tag_name("msg")) {
            let Some((day, time)) = msg.attribute("time").and_then(|t| t.trim().split_once(' ')) else {
                warn!(file = ?path, "dropping message without time");
                continue;
            };
            let raw = format!("{}-{}-{} {}", head.year, head.month, day, time.trim());
            let ts = match self.normalizer.normalize(&raw, FormatHint::Kopete) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(file = ?path, error = %e, "dropping record");
                    continue;
                }
            };

            let (from, to) = if msg.attribute("in") == Some("1") {
                (msg.attribute("from").unwrap_or(head.other.as_str()), head.myself.as_str())
            } else {
                (head.myself.as_str(), head.other.as_str())
            };
            let text = msg.text().unwrap_or_default().trim();
            out.push(Message::new(ts, platform, from, MessageTarget::user(to), text));
        }
        Ok(out)
    }

    fn protocol_of(&self, root: &Path, path: &Path) -> Option<Platform> {
        top_level_dir(root, path).and_then(|dir| self.platforms.get(dir))
    }
}

impl SourceAdapter for KopeteAdapter {
    fn name(&self) -> &'static str {
        "Kopete"
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Kopete
    }

    fn contacts(&self) -> Result<ContactStream<'_>> {
        let path = self.options.require_file(CONTACTS_FORMAT)?;
        let content = self.decoder.read_to_string(path)?;
        Ok(Box::new(self.parse_contacts(&content, Some(path))?.into_iter().map(Ok)))
    }

    fn messages(&self) -> Result<MessageStream<'_>> {
        let root = self.options.require_root(HISTORY_FORMAT)?;
        let files: Vec<PathBuf> = discover_files(root, &["xml"])?
            .into_iter()
            .filter(|path| {
                let known = self.protocol_of(root, path).is_some();
                if !known {
                    debug!(file = %path.display(), "ignoring file outside protocol directories");
                }
                known
            })
            .collect();
        Ok(per_file(files, move |path| {
            let platform = self
                .protocol_of(root, path)
                .ok_or_else(|| ArchiveError::invalid_format(HISTORY_FORMAT, "file outside protocol directories"))?;
            let content = self.decoder.read_to_string(path)?;
            Ok(self.parse_history(platform, &content, Some(path))?.into_iter().map(Ok))
        }))
    }
}
