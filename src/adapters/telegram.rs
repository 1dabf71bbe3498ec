//! Telegram history dumps: a directory of `*.jsonl` files, one event per line.
//!
//! Only `"event": "message"` records that are not service notices become
//! messages. Peers are identified by `peer_id`, falling back to the opaque
//! `id` string; the recipient is a user or a group depending on the `to`
//! peer's `peer_type`.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::adapter::{ContactStream, MessageStream, SourceAdapter, SourceFormat, discover_files, json_lines, per_file};
use crate::config::SourceOptions;
use crate::contact::{Contact, PlatformIdentity};
use crate::error::Result;
use crate::message::{Message, MessageTarget, Platform};
use crate::parsing::{TextDecoder, TimestampNormalizer};

const FORMAT: &str = "Telegram JSONL";

#[derive(Debug, Clone, Deserialize)]
struct Peer {
    id: Option<String>,
    peer_id: Option<Value>,
    peer_type: Option<String>,
    print_name: Option<String>,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
}

impl Peer {
    fn key(&self) -> Option<String> {
        match &self.peer_id {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => self.id.clone().filter(|id| !id.is_empty()),
        }
    }

    fn is_user(&self) -> bool {
        self.peer_type.as_deref().is_none_or(|t| t == "user")
    }

    fn identity(&self) -> Option<PlatformIdentity> {
        let id = self.key()?;
        let mut identity = PlatformIdentity::new(id, Platform::Telegram)
            .with_display_name(self.print_name.clone().unwrap_or_default());
        for (key, value) in [
            ("username", &self.username),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone", &self.phone),
        ] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                identity = identity.with_meta(key, value);
            }
        }
        Some(identity)
    }
}

#[derive(Debug, Deserialize)]
struct Event {
    event: Option<String>,
    #[serde(default)]
    service: bool,
    from: Option<Peer>,
    to: Option<Peer>,
    text: Option<String>,
    date: Option<i64>,
    media: Option<Value>,
}

/// Adapter for Telegram JSONL directories.
#[derive(Debug, Clone)]
pub struct TelegramAdapter {
    options: SourceOptions,
    decoder: TextDecoder,
    normalizer: TimestampNormalizer,
}

impl TelegramAdapter {
    pub fn new(options: SourceOptions) -> Result<Self> {
        Ok(Self {
            decoder: options.decoder()?,
            options,
            normalizer: TimestampNormalizer::default(),
        })
    }

    /// Parses one JSONL file held in memory.
    pub fn parse_str(&self, content: &str) -> Vec<Result<Message>> {
        json_lines(content, FORMAT, None)
            .into_iter()
            .filter_map(|event| self.convert(event))
            .collect()
    }

    fn convert(&self, event: Result<Event>) -> Option<Result<Message>> {
        let event = match event {
            Ok(event) => event,
            Err(e) => return Some(Err(e)),
        };
        if event.event.as_deref() != Some("message") || event.service {
            return None;
        }
        let (Some(from), Some(to)) = (event.from.as_ref().and_then(Peer::key), event.to.as_ref()) else {
            warn!("dropping message without sender or recipient");
            return None;
        };
        let Some(to_id) = to.key() else {
            warn!(from = %from, "dropping message without recipient id");
            return None;
        };
        let target = if to.is_user() {
            MessageTarget::user(to_id)
        } else {
            MessageTarget::group(to_id)
        };

        let ts = match event.date.map(|d| self.normalizer.normalize_epoch(d)) {
            Some(Ok(ts)) => ts,
            Some(Err(e)) => {
                warn!(error = %e, "dropping record");
                return None;
            }
            None => {
                warn!(from = %from, "dropping record without date");
                return None;
            }
        };

        let message = Message::new(ts, Platform::Telegram, from, target, event.text.unwrap_or_default());
        let media_type = event
            .media
            .as_ref()
            .and_then(|m| m.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Ok(match media_type {
            Some(kind) => message.with_meta("media", kind),
            None => message,
        }))
    }

    fn sightings(event: Result<Event>) -> Vec<Result<Contact>> {
        let event = match event {
            Ok(event) => event,
            Err(e) => return vec![Err(e)],
        };
        if event.event.as_deref() != Some("message") {
            return Vec::new();
        }
        [event.from, event.to]
            .into_iter()
            .flatten()
            .filter(Peer::is_user)
            .filter_map(|peer| peer.identity())
            .map(|identity| Ok(Contact::from_identity(identity)))
            .collect()
    }

    fn file_events(&self, path: &std::path::Path) -> Result<Vec<Result<Event>>> {
        let content = self.decoder.read_to_string(path)?;
        Ok(json_lines(&content, FORMAT, Some(path)))
    }
}

impl SourceAdapter for TelegramAdapter {
    fn name(&self) -> &'static str {
        "Telegram"
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Telegram
    }

    fn contacts(&self) -> Result<ContactStream<'_>> {
        let files = discover_files(self.options.require_root(FORMAT)?, &["jsonl"])?;
        Ok(per_file(files, move |path| {
            Ok(self.file_events(path)?.into_iter().flat_map(Self::sightings))
        }))
    }

    fn messages(&self) -> Result<MessageStream<'_>> {
        let files = discover_files(self.options.require_root(FORMAT)?, &["jsonl"])?;
        debug!(count = files.len(), "telegram dump files");
        Ok(per_file(files, move |path| {
            Ok(self.file_events(path)?.into_iter().filter_map(move |event| self.convert(event)))
        }))
    }
}
