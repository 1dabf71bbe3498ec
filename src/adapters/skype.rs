//! Skype `messages.json` export and contacts CSV.
//!
//! Messages come from `conversations[].MessageList[]`. Identifiers carry a
//! network prefix (`8:live:bob`) which is dropped. A message whose sender is
//! the conversation itself was received, so its recipient is the owner:
//! `-u` when given, otherwise the export's own `userId`. Conversations with a
//! `19:` id are group threads.
//!
//! Contacts come from the CSV export (`--contacts`): one identity per row with
//! a `profile.skype_handle`, every other non-empty column kept as metadata.
//! Without a CSV, each conversation's id and display name are used.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::adapter::{ContactStream, MessageStream, SourceAdapter, SourceFormat};
use crate::config::SourceOptions;
use crate::contact::{Contact, PlatformIdentity};
use crate::error::{ArchiveError, Result};
use crate::message::{Message, MessageTarget, Meta, Platform};
use crate::parsing::{FormatHint, TextDecoder, TimestampNormalizer, extract_links, extract_mentions, strip_markup};

const JSON_FORMAT: &str = "Skype JSON";
const CSV_FORMAT: &str = "Skype contacts CSV";
const GROUP_THREAD_PREFIX: &str = "19:";

/// Columns that shape the identity itself rather than its metadata.
const IDENTITY_COLUMNS: &[&str] = &["id", "display_name", "profile.skype_handle"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkypeExport {
    user_id: Option<String>,
    #[serde(default)]
    conversations: Vec<SkypeConversation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkypeConversation {
    id: String,
    display_name: Option<String>,
    #[serde(rename = "MessageList", default)]
    message_list: Vec<SkypeMessage>,
}

#[derive(Debug, Deserialize)]
struct SkypeMessage {
    originalarrivaltime: String,
    #[serde(default)]
    from: String,
    content: Option<String>,
    properties: Option<serde_json::Map<String, Value>>,
}

/// Drops the network prefix: `8:live:bob` becomes `live:bob`.
pub fn strip_network_prefix(id: &str) -> &str {
    id.split_once(':').map_or(id, |(_, rest)| rest)
}

/// Adapter for Skype JSON exports.
#[derive(Debug, Clone)]
pub struct SkypeAdapter {
    options: SourceOptions,
    decoder: TextDecoder,
    normalizer: TimestampNormalizer,
}

impl SkypeAdapter {
    pub fn new(options: SourceOptions) -> Result<Self> {
        Ok(Self {
            decoder: options.decoder()?,
            options,
            normalizer: TimestampNormalizer::default(),
        })
    }

    fn load_export(&self, path: &Path) -> Result<SkypeExport> {
        let content = self.decoder.read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ArchiveError::json_parse(JSON_FORMAT, e, Some(path.to_path_buf())))
    }

    /// Parses a whole `messages.json` document held in memory.
    pub fn parse_str(&self, content: &str) -> Result<Vec<Result<Message>>> {
        let export: SkypeExport =
            serde_json::from_str(content).map_err(|e| ArchiveError::json_parse(JSON_FORMAT, e, None))?;
        Ok(self.convert(export).collect())
    }

    fn convert(&self, export: SkypeExport) -> impl Iterator<Item = Result<Message>> + '_ {
        let owner = self
            .options
            .owner
            .clone()
            .or_else(|| export.user_id.as_deref().map(|id| strip_network_prefix(id).to_string()));

        export.conversations.into_iter().flat_map(move |conv| {
            let owner = owner.clone();
            let is_group = conv.id.starts_with(GROUP_THREAD_PREFIX);
            let conv_id = strip_network_prefix(&conv.id).to_string();
            conv.message_list
                .into_iter()
                .filter_map(move |msg| self.convert_message(owner.as_deref(), &conv_id, is_group, msg))
        })
    }

    fn convert_message(
        &self,
        owner: Option<&str>,
        conv_id: &str,
        is_group: bool,
        msg: SkypeMessage,
    ) -> Option<Result<Message>> {
        let ts = match self.normalizer.normalize(&msg.originalarrivaltime, FormatHint::Iso8601) {
            Ok(ts) => ts,
            Err(e) => {
                warn!(conversation = conv_id, error = %e, "dropping record");
                return None;
            }
        };

        let from = strip_network_prefix(&msg.from).to_string();
        let to = if is_group {
            MessageTarget::group(conv_id)
        } else if from == conv_id {
            match owner {
                Some(owner) => MessageTarget::user(owner),
                None => return Some(Err(ArchiveError::unresolved(from, "Skype message recipient"))),
            }
        } else {
            MessageTarget::user(conv_id)
        };

        let raw = msg.content.unwrap_or_default();
        let text = strip_markup(&raw);

        let mut meta = Meta::new();
        for (key, value) in msg.properties.into_iter().flatten() {
            match value {
                Value::Null => {}
                Value::String(s) => {
                    meta.insert(key, s.into());
                }
                other => {
                    meta.insert(key, other.to_string().into());
                }
            }
        }
        let links = extract_links(&raw);
        if !links.is_empty() {
            meta.insert("links".to_string(), links.into());
        }
        let mentions = extract_mentions(&raw);
        if !mentions.is_empty() {
            meta.insert("mentions".to_string(), mentions.into());
        }

        let message = Message::new(ts, Platform::Skype, from, to, text.clone()).with_meta_map(meta);
        Some(Ok(if text == raw { message } else { message.with_raw(raw) }))
    }

    /// Parses the contacts CSV export held in memory.
    pub fn parse_contacts_csv(&self, content: &str, path: Option<&Path>) -> Result<Vec<Contact>> {
        let to_err = |e| ArchiveError::csv_parse(CSV_FORMAT, e, path.map(Path::to_path_buf));
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = reader.headers().map_err(to_err)?.clone();

        let mut out = Vec::new();
        for record in reader.records() {
            let record = record.map_err(to_err)?;
            let column = |name: &str| headers.iter().position(|h| h == name).and_then(|i| record.get(i));

            let Some(handle) = column("profile.skype_handle").filter(|h| !h.is_empty()) else {
                continue;
            };
            let display_name = column("display_name").unwrap_or_default();

            let mut identity = PlatformIdentity::new(handle, Platform::Skype).with_display_name(display_name);
            for (key, value) in headers.iter().zip(record.iter()) {
                if !IDENTITY_COLUMNS.contains(&key) {
                    identity = identity.with_meta(key, value);
                }
            }
            out.push(Contact::from_identity(identity));
        }
        Ok(out)
    }

    fn conversation_contacts(export: SkypeExport) -> impl Iterator<Item = Result<Contact>> {
        export
            .conversations
            .into_iter()
            .filter(|conv| !conv.id.starts_with(GROUP_THREAD_PREFIX))
            .map(|conv| {
                let identity = PlatformIdentity::new(strip_network_prefix(&conv.id), Platform::Skype)
                    .with_display_name(conv.display_name.unwrap_or_default());
                Ok(Contact::from_identity(identity))
            })
    }
}

impl SourceAdapter for SkypeAdapter {
    fn name(&self) -> &'static str {
        "Skype"
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Skype
    }

    fn contacts(&self) -> Result<ContactStream<'_>> {
        if let Some(path) = self.options.contacts_file.as_deref() {
            let content = self.decoder.read_to_string(path)?;
            let contacts = self.parse_contacts_csv(&content, Some(path))?;
            return Ok(Box::new(contacts.into_iter().map(Ok)));
        }
        let export = self.load_export(self.options.require_file(JSON_FORMAT)?)?;
        Ok(Box::new(Self::conversation_contacts(export)))
    }

    fn messages(&self) -> Result<MessageStream<'_>> {
        let export = self.load_export(self.options.require_file(JSON_FORMAT)?)?;
        Ok(Box::new(self.convert(export)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MetaValue;
    use chrono::{TimeZone, Utc};

    const EXPORT: &str = r#"{
  "userId": "8:live:bob",
  "exportDate": "2023-12-21T06:51",
  "conversations": [
    {
      "id": "8:live:alice",
      "displayName": "Alice",
      "MessageList": [
        {
          "id": "1",
          "originalarrivaltime": "2022-10-28T19:30:27.53Z",
          "messagetype": "RichText",
          "content": "<b>hi</b> @bob see https://example.com/a",
          "conversationid": "8:live:alice",
          "from": "8:live:alice",
          "properties": {"edittime": "1666985427", "deletetime": null, "urlpreviews": 3}
        },
        {
          "id": "2",
          "originalarrivaltime": "2022-10-28T19:31:00Z",
          "content": "plain reply",
          "from": "8:live:bob",
          "properties": null
        },
        {
          "id": "3",
          "originalarrivaltime": "not a time",
          "content": "dropped",
          "from": "8:live:bob"
        }
      ]
    },
    {
      "id": "19:abc@thread.skype",
      "displayName": "Team",
      "MessageList": [
        {"originalarrivaltime": "2022-10-29T08:00:00Z", "content": null, "from": "8:live:carol"}
      ]
    }
  ]
}"#;

    fn adapter(options: SourceOptions) -> SkypeAdapter {
        SkypeAdapter::new(options).unwrap()
    }

    fn messages(options: SourceOptions) -> Vec<Message> {
        adapter(options)
            .parse_str(EXPORT)
            .unwrap()
            .into_iter()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_strip_network_prefix() {
        assert_eq!(strip_network_prefix("8:live:bob"), "live:bob");
        assert_eq!(strip_network_prefix("plainid"), "plainid");
    }

    #[test]
    fn test_incoming_message_targets_export_owner() {
        let msgs = messages(SourceOptions::new());
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].from, "live:alice");
        assert_eq!(msgs[0].to, MessageTarget::user("live:bob"));
        assert_eq!(msgs[0].ts, Utc.with_ymd_and_hms(2022, 10, 28, 19, 30, 27).unwrap());
    }

    #[test]
    fn test_explicit_owner_wins() {
        let msgs = messages(SourceOptions::new().with_owner("robert"));
        assert_eq!(msgs[0].to, MessageTarget::user("robert"));
    }

    #[test]
    fn test_outgoing_message_targets_conversation() {
        let msgs = messages(SourceOptions::new());
        assert_eq!(msgs[1].from, "live:bob");
        assert_eq!(msgs[1].to, MessageTarget::user("live:alice"));
        assert!(msgs[1].raw.is_none());
        assert!(msgs[1].meta.is_empty());
    }

    #[test]
    fn test_markup_links_mentions_properties() {
        let msg = &messages(SourceOptions::new())[0];
        assert_eq!(msg.text, "hi @bob see https://example.com/a");
        assert_eq!(msg.raw.as_deref(), Some("<b>hi</b> @bob see https://example.com/a"));
        assert_eq!(msg.meta["links"], MetaValue::List(vec!["https://example.com/a".into()]));
        assert_eq!(msg.meta["mentions"], MetaValue::List(vec!["bob".into()]));
        assert_eq!(msg.meta["edittime"], MetaValue::from("1666985427"));
        assert_eq!(msg.meta["urlpreviews"], MetaValue::from("3"));
        assert!(!msg.meta.contains_key("deletetime"));
    }

    #[test]
    fn test_group_thread() {
        let msg = &messages(SourceOptions::new())[2];
        assert_eq!(msg.to, MessageTarget::group("abc@thread.skype"));
        assert_eq!(msg.text, "");
    }

    #[test]
    fn test_unresolved_owner() {
        let export = r#"{"conversations":[{"id":"8:alice","MessageList":[{"originalarrivaltime":"2022-10-28T19:30:27Z","content":"x","from":"8:alice"}]}]}"#;
        let results = adapter(SourceOptions::new()).parse_str(export).unwrap();
        assert!(results[0].as_ref().unwrap_err().is_unresolved());
    }

    #[test]
    fn test_malformed_export() {
        assert!(adapter(SourceOptions::new()).parse_str("{ nope").unwrap_err().is_parse());
    }

    #[test]
    fn test_contacts_csv() {
        let csv = "type,id,display_name,profile.avatar_url,profile.mood,profile.skype_handle\n\
                   skype,8:live:alice,Alice A,https://avatars.example/a.jpg,busy,live:alice\n\
                   skype,8:nohandle,Nobody,,,\n\
                   skype,8:carol,,,,carol\n";
        let contacts = adapter(SourceOptions::new()).parse_contacts_csv(csv, None).unwrap();
        assert_eq!(contacts.len(), 2);

        let alice = &contacts[0];
        assert_eq!(alice.name, "Alice A");
        let id = alice.primary();
        assert_eq!(id.id, "live:alice");
        assert_eq!(id.meta["profile.mood"], MetaValue::from("busy"));
        assert_eq!(id.meta["profile.avatar_url"], MetaValue::from("https://avatars.example/a.jpg"));
        assert_eq!(id.meta["type"], MetaValue::from("skype"));
        assert!(!id.meta.contains_key("id"));
        assert!(!id.meta.contains_key("display_name"));

        assert_eq!(contacts[1].name, "");
        assert!(!contacts[1].primary().meta.contains_key("profile.mood"));
    }

    #[test]
    fn test_contacts_from_conversations_without_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        std::fs::write(&path, EXPORT).unwrap();

        let adapter = adapter(SourceOptions::new().with_file(&path));
        let contacts: Vec<_> = adapter.contacts().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Alice");
        assert_eq!(contacts[0].primary().id, "live:alice");

        // restartable
        let first: Vec<_> = adapter.messages().unwrap().map(|r| r.unwrap()).collect();
        let second: Vec<_> = adapter.messages().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(first, second);
    }
}
