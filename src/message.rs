//! Canonical message type shared by all source adapters.
//!
//! Every adapter converts its native records into [`Message`], which
//! serializes to exactly one JSON object per line:
//!
//! ```json
//! {"ts":"2000-03-01T09:33:50Z","platform":"google","from":"alice@example.com",
//!  "to":{"type":"group","group_id":"Space AAAA"},"text":"Hi Bob","meta":{}}
//! ```
//!
//! # Examples
//!
//! ```
//! use chatarchive::message::{Message, MessageTarget, Platform};
//! use chrono::{TimeZone, Utc};
//!
//! let ts = Utc.with_ymd_and_hms(2002, 1, 24, 21, 54, 39).unwrap();
//! let msg = Message::new(ts, Platform::Icq, "000001", MessageTarget::user("123456"), "Hi Bob");
//!
//! let json = serde_json::to_string(&msg)?;
//! assert!(json.starts_with(r#"{"ts":"2002-01-24T21:54:39Z","platform":"icq""#));
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Messaging networks a record can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Skype,
    Icq,
    Msn,
    Sms,
    Telegram,
    Irc,
    Yahoo,
    Jabber,
    Google,
}

impl Platform {
    /// Returns the wire tag for this platform.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Skype => "skype",
            Platform::Icq => "icq",
            Platform::Msn => "msn",
            Platform::Sms => "sms",
            Platform::Telegram => "telegram",
            Platform::Irc => "irc",
            Platform::Yahoo => "yahoo",
            Platform::Jabber => "jabber",
            Platform::Google => "google",
        }
    }

    /// Returns all platforms.
    pub fn all() -> &'static [Platform] {
        &[
            Platform::Skype,
            Platform::Icq,
            Platform::Msn,
            Platform::Sms,
            Platform::Telegram,
            Platform::Irc,
            Platform::Yahoo,
            Platform::Jabber,
            Platform::Google,
        ]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Platform::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| format!("Unknown platform: '{}'", s))
    }
}

/// A single metadata value: either one string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    List(Vec<String>),
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Text(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for MetaValue {
    fn from(value: Vec<String>) -> Self {
        MetaValue::List(value)
    }
}

/// Free-form per-platform attributes, ordered by key for stable output.
pub type Meta = BTreeMap<String, MetaValue>;

/// Recipient of a message: a single user or a group conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageTarget {
    User { user_id: String },
    Group { group_id: String },
}

impl MessageTarget {
    /// Targets a single user.
    pub fn user(id: impl Into<String>) -> Self {
        MessageTarget::User { user_id: id.into() }
    }

    /// Targets a group conversation.
    pub fn group(id: impl Into<String>) -> Self {
        MessageTarget::Group { group_id: id.into() }
    }

    /// Returns the user or group identifier.
    pub fn id(&self) -> &str {
        match self {
            MessageTarget::User { user_id } => user_id,
            MessageTarget::Group { group_id } => group_id,
        }
    }

    /// Returns `true` for group targets.
    pub fn is_group(&self) -> bool {
        matches!(self, MessageTarget::Group { .. })
    }
}

/// A normalized chat message.
///
/// Messages are created by an adapter, written out immediately and never
/// retained. Within one source file `ts` is non-decreasing; across files no
/// ordering is guaranteed, since messages are emitted in discovery order.
///
/// # Serialization
///
/// | Field | JSON |
/// |-------|------|
/// | `ts` | `"%Y-%m-%dT%H:%M:%SZ"`, whole seconds |
/// | `platform` | lowercase tag |
/// | `from` | platform identifier |
/// | `to` | `{"type":"user","user_id":..}` or `{"type":"group","group_id":..}` |
/// | `text` | markup-free body |
/// | `raw` | omitted when `None` |
/// | `meta` | always present, possibly `{}` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(with = "utc_seconds")]
    pub ts: DateTime<Utc>,

    pub platform: Platform,

    pub from: String,

    pub to: MessageTarget,

    /// Human-readable body with markup removed.
    pub text: String,

    /// Original body, present only when the source supplies formatted content.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub raw: Option<String>,

    #[serde(default)]
    pub meta: Meta,
}

impl Message {
    /// Creates a message, truncating `ts` to whole seconds.
    pub fn new(
        ts: DateTime<Utc>,
        platform: Platform,
        from: impl Into<String>,
        to: MessageTarget,
        text: impl Into<String>,
    ) -> Self {
        Self {
            ts: ts.trunc_subsecs(0),
            platform,
            from: from.into(),
            to,
            text: text.into(),
            raw: None,
            meta: Meta::new(),
        }
    }

    /// Builder method to attach the original formatted body.
    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Builder method to add one metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Builder method to replace all metadata.
    #[must_use]
    pub fn with_meta_map(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }
}

/// Serde adapter rendering instants as `2000-03-01T09:33:50Z`.
pub mod utc_seconds {
    use chrono::{DateTime, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(0))
            .map_err(serde::de::Error::custom)
    }
}
