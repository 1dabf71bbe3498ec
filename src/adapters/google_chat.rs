//! Google Chat takeout (`Google Chat/Groups/`).
//!
//! Every group directory holds a `group_info.json` listing its members and a
//! `messages.json` with the conversation. Messages always target the group,
//! identified by its directory name.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::adapter::{ContactStream, MessageStream, SourceAdapter, SourceFormat, discover_files, per_file};
use crate::config::SourceOptions;
use crate::contact::{Contact, PlatformIdentity};
use crate::error::{ArchiveError, Result};
use crate::message::{Message, MessageTarget, Platform};
use crate::parsing::{FormatHint, TextDecoder, TimestampNormalizer};

const FORMAT: &str = "Google Chat takeout";
const MESSAGES_FILE: &str = "messages.json";
const GROUP_INFO_FILE: &str = "group_info.json";

#[derive(Debug, Default, Deserialize)]
struct User {
    #[serde(default)]
    name: String,
    email: Option<String>,
    user_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupInfo {
    #[serde(default)]
    members: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    creator: Option<User>,
    created_date: Option<String>,
    #[serde(default)]
    text: String,
    topic_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageFile {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

/// Drops the leading weekday: `Sunday, 1 March 2000 at ...` becomes `1 March 2000 at ...`.
fn strip_weekday(raw: &str) -> &str {
    raw.split_once(", ").map_or(raw, |(_, rest)| rest).trim()
}

/// Adapter for Google Chat group exports.
#[derive(Debug, Clone)]
pub struct GoogleChatAdapter {
    options: SourceOptions,
    decoder: TextDecoder,
    normalizer: TimestampNormalizer,
}

impl GoogleChatAdapter {
    pub fn new(options: SourceOptions) -> Result<Self> {
        Ok(Self {
            decoder: options.decoder()?,
            options,
            normalizer: TimestampNormalizer::default(),
        })
    }

    /// Parses one group's `messages.json`.
    pub fn parse_messages(&self, group_id: &str, content: &str, path: Option<&Path>) -> Result<Vec<Message>> {
        let file: MessageFile = serde_json::from_str(content)
            .map_err(|e| ArchiveError::json_parse(FORMAT, e, path.map(Path::to_path_buf)))?;

        let mut out = Vec::with_capacity(file.messages.len());
        for msg in file.messages {
            let Some(from) = msg.creator.and_then(|c| c.email) else {
                warn!(group = group_id, "dropping message without creator email");
                continue;
            };
            let Some(raw_ts) = msg.created_date else {
                warn!(group = group_id, from = %from, "dropping message without date");
                continue;
            };
            let ts = match self.normalizer.normalize(strip_weekday(&raw_ts), FormatHint::GoogleChat) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(group = group_id, error = %e, "dropping record");
                    continue;
                }
            };
            let mut message = Message::new(ts, Platform::Google, from, MessageTarget::group(group_id), msg.text);
            if let Some(topic) = msg.topic_id.filter(|t| !t.is_empty()) {
                message = message.with_meta("topic_id", topic);
            }
            out.push(message);
        }
        Ok(out)
    }

    /// Parses one group's `group_info.json` into member contacts.
    pub fn parse_group_info(&self, content: &str, path: Option<&Path>) -> Result<Vec<Contact>> {
        let info: GroupInfo = serde_json::from_str(content)
            .map_err(|e| ArchiveError::json_parse(FORMAT, e, path.map(Path::to_path_buf)))?;

        Ok(info
            .members
            .into_iter()
            .filter_map(|member| {
                let email = member.email.filter(|e| !e.is_empty())?;
                let mut identity = PlatformIdentity::new(email, Platform::Google).with_display_name(member.name);
                if let Some(kind) = member.user_type {
                    identity = identity.with_meta("user_type", kind);
                }
                Some(Contact::from_identity(identity))
            })
            .collect())
    }

    fn files_named(&self, name: &str) -> Result<Vec<std::path::PathBuf>> {
        let files = discover_files(self.options.require_root(FORMAT)?, &["json"])?;
        Ok(files
            .into_iter()
            .filter(|p| p.file_name().is_some_and(|f| f == name))
            .collect())
    }
}

fn group_id(path: &Path) -> Result<&str> {
    path.parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .ok_or_else(|| ArchiveError::invalid_format(FORMAT, format!("{} has no group directory", path.display())))
}

impl SourceAdapter for GoogleChatAdapter {
    fn name(&self) -> &'static str {
        "Google Chat"
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::GoogleChat
    }

    fn contacts(&self) -> Result<ContactStream<'_>> {
        let files = self.files_named(GROUP_INFO_FILE)?;
        Ok(per_file(files, move |path| {
            let content = self.decoder.read_to_string(path)?;
            Ok(self.parse_group_info(&content, Some(path))?.into_iter().map(Ok))
        }))
    }

    fn messages(&self) -> Result<MessageStream<'_>> {
        let files = self.files_named(MESSAGES_FILE)?;
        Ok(per_file(files, move |path| {
            let group = group_id(path)?;
            let content = self.decoder.read_to_string(path)?;
            Ok(self.parse_messages(group, &content, Some(path))?.into_iter().map(Ok))
        }))
    }
}
