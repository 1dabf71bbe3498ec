//! Canonical contact types.
//!
//! A [`Contact`] groups one or more [`PlatformIdentity`] values under a best
//! effort display name. Contacts are emitted as a single JSON array in the
//! canonical shape:
//!
//! ```json
//! [{"name": "Alice", "platform_ids": [{"id": "000001", "platform": "icq", "avatar": "", "meta": {}}]}]
//! ```
//!
//! Identity objects carry no `name` field and the array key is always
//! `platform_ids`; older exports that used `platforms` are not reproduced.

use serde::{Deserialize, Serialize};

use crate::message::{Meta, MetaValue, Platform};

/// An account on one platform.
///
/// `(id, platform)` identifies the account within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformIdentity {
    pub id: String,

    pub platform: Platform,

    /// Name shown by the source for this account. Used to pick
    /// [`Contact::name`], not serialized.
    #[serde(skip)]
    pub display_name: String,

    /// Avatar file reference, empty when unknown.
    #[serde(default)]
    pub avatar: String,

    #[serde(default)]
    pub meta: Meta,
}

impl PlatformIdentity {
    pub fn new(id: impl Into<String>, platform: Platform) -> Self {
        Self {
            id: id.into(),
            platform,
            display_name: String::new(),
            avatar: String::new(),
            meta: Meta::new(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Adds a metadata entry, ignoring empty string values.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        let value = value.into();
        if !matches!(&value, MetaValue::Text(s) if s.is_empty()) {
            self.meta.insert(key.into(), value);
        }
        self
    }

    /// Returns the deduplication key.
    pub fn key(&self) -> (Platform, &str) {
        (self.platform, &self.id)
    }
}

/// A person, possibly known under several platform identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,

    #[serde(rename = "platform_ids")]
    identities: Vec<PlatformIdentity>,
}

impl Contact {
    /// Creates a contact from its first identity.
    ///
    /// The name falls back to the identity's display name when `name` is empty.
    pub fn new(name: impl Into<String>, identity: PlatformIdentity) -> Self {
        let mut name = name.into();
        if name.trim().is_empty() {
            name.clone_from(&identity.display_name);
        }
        Self {
            name,
            identities: vec![identity],
        }
    }

    /// Creates a contact named after the identity's display name.
    pub fn from_identity(identity: PlatformIdentity) -> Self {
        Self::new(String::new(), identity)
    }

    /// Adds another identity unless the same `(platform, id)` is already present.
    #[must_use]
    pub fn with_identity(mut self, identity: PlatformIdentity) -> Self {
        if !self.identities.iter().any(|i| i.key() == identity.key()) {
            self.identities.push(identity);
        }
        self
    }

    /// Returns the identities in insertion order. Never empty.
    pub fn identities(&self) -> &[PlatformIdentity] {
        &self.identities
    }

    /// Returns the identity that keys this contact.
    pub fn primary(&self) -> &PlatformIdentity {
        &self.identities[0]
    }

    /// Fills in the name if it is still empty. Never overwrites.
    pub fn fill_name(&mut self, candidate: &str) -> bool {
        if self.name.trim().is_empty() && !candidate.trim().is_empty() {
            self.name = candidate.to_string();
            return true;
        }
        false
    }
}
