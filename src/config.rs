//! Configuration types for source adapters.
//!
//! There is no configuration file: every run is configured explicitly through
//! [`SourceOptions`], and the per-source lookup tables are plain values
//! ([`PlatformMap`]) handed to adapters when they are built.
//!
//! # Example
//!
//! ```rust
//! use chatarchive::config::SourceOptions;
//!
//! let options = SourceOptions::new()
//!     .with_root("TrillianLogs/")
//!     .with_owner("bob")
//!     .with_encoding("windows-1251")
//!     .with_session_interval(5);
//!
//! assert_eq!(options.owner.as_deref(), Some("bob"));
//! ```

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};
use crate::message::Platform;
use crate::parsing::TextDecoder;

/// Seconds between synthesized transcript timestamps.
pub const DEFAULT_SESSION_INTERVAL_SECS: u32 = 5;

/// Inputs and knobs shared by all adapters.
///
/// Which fields an adapter needs depends on its export layout; adapters
/// report a missing one through [`ArchiveError::MissingInput`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Root directory of a multi-file export (`-d`)
    pub root: Option<PathBuf>,

    /// Single export file (`-f`)
    pub file: Option<PathBuf>,

    /// Separately exported contact list (`--contacts`)
    pub contacts_file: Option<PathBuf>,

    /// Platform id of the archive owner (`-u`)
    pub owner: Option<String>,

    /// Encoding label for text inputs (default: `utf-8`)
    pub encoding: String,

    /// Spacing of synthesized transcript timestamps (default: 5s)
    pub session_interval_secs: u32,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            root: None,
            file: None,
            contacts_file: None,
            owner: None,
            encoding: "utf-8".to_string(),
            session_interval_secs: DEFAULT_SESSION_INTERVAL_SECS,
        }
    }
}

impl SourceOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the export root directory.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Sets the single export file.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets the auxiliary contact list file.
    #[must_use]
    pub fn with_contacts_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.contacts_file = Some(file.into());
        self
    }

    /// Sets the owner id. Blank ids are treated as absent.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        let owner = owner.into();
        self.owner = if owner.trim().is_empty() { None } else { Some(owner) };
        self
    }

    /// Sets the text encoding label.
    #[must_use]
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    /// Sets the synthesized timestamp spacing in seconds.
    #[must_use]
    pub fn with_session_interval(mut self, secs: u32) -> Self {
        self.session_interval_secs = secs;
        self
    }

    /// Resolves the encoding label.
    pub fn decoder(&self) -> Result<TextDecoder> {
        TextDecoder::for_label(&self.encoding)
    }

    pub fn session_interval(&self) -> Duration {
        Duration::seconds(i64::from(self.session_interval_secs))
    }

    pub fn require_root(&self, format: &'static str) -> Result<&Path> {
        self.root
            .as_deref()
            .ok_or(ArchiveError::MissingInput {
                format,
                what: "source directory (-d)",
            })
    }

    pub fn require_file(&self, format: &'static str) -> Result<&Path> {
        self.file
            .as_deref()
            .ok_or(ArchiveError::MissingInput {
                format,
                what: "export file (-f)",
            })
    }

    /// Returns the owner id or an unresolved reference error.
    pub fn require_owner(&self, context: &'static str) -> Result<&str> {
        self.owner
            .as_deref()
            .ok_or_else(|| ArchiveError::unresolved("<owner>", context))
    }
}

/// Immutable lookup from a source-specific tag to a [`Platform`].
///
/// Lookups ignore ASCII case; tags keep their original spelling so they can
/// double as directory names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformMap {
    entries: Vec<(String, Platform)>,
}

impl PlatformMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a mapping.
    #[must_use]
    pub fn with(mut self, tag: impl Into<String>, platform: Platform) -> Self {
        let tag = tag.into();
        self.entries.retain(|(t, _)| !t.eq_ignore_ascii_case(&tag));
        self.entries.push((tag, platform));
        self
    }

    /// Trillian log directories and session marker tags.
    pub fn trillian() -> Self {
        Self::new()
            .with("ICQ", Platform::Icq)
            .with("IRC", Platform::Irc)
            .with("MSN", Platform::Msn)
            .with("YAHOO", Platform::Yahoo)
    }

    /// Kopete protocol plugin ids, which are also the log directory names.
    pub fn kopete() -> Self {
        Self::new()
            .with("ICQProtocol", Platform::Icq)
            .with("JabberProtocol", Platform::Jabber)
            .with("MSNProtocol", Platform::Msn)
    }

    pub fn get(&self, tag: &str) -> Option<Platform> {
        self.entries
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(tag))
            .map(|(_, p)| *p)
    }

    /// Iterates over `(tag, platform)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Platform)> {
        self.entries.iter().map(|(t, p)| (t.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_options_default() {
        let options = SourceOptions::default();
        assert_eq!(options.encoding, "utf-8");
        assert_eq!(options.session_interval(), Duration::seconds(5));
        assert!(options.owner.is_none());
        assert_eq!(options.decoder().unwrap().name(), "UTF-8");
    }

    #[test]
    fn test_source_options_builder() {
        let options = SourceOptions::new()
            .with_file("messages.json")
            .with_contacts_file("contacts.csv")
            .with_owner("live:bob")
            .with_session_interval(10);

        assert_eq!(options.require_file("skype").unwrap(), Path::new("messages.json"));
        assert_eq!(options.contacts_file.as_deref(), Some(Path::new("contacts.csv")));
        assert_eq!(options.require_owner("owner").unwrap(), "live:bob");
        assert_eq!(options.session_interval(), Duration::seconds(10));
    }

    #[test]
    fn test_blank_owner_is_absent() {
        let options = SourceOptions::new().with_owner("  ");
        let err = options.require_owner("message recipient").unwrap_err();
        assert!(err.is_unresolved());
    }

    #[test]
    fn test_missing_root() {
        let err = SourceOptions::new().require_root("trillian").unwrap_err();
        assert!(matches!(err, ArchiveError::MissingInput { format: "trillian", .. }));
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(SourceOptions::new().with_encoding("nope").decoder().is_err());
    }

    #[test]
    fn test_platform_map_lookup_ignores_case() {
        let map = PlatformMap::trillian();
        assert_eq!(map.get("icq"), Some(Platform::Icq));
        assert_eq!(map.get("Yahoo"), Some(Platform::Yahoo));
        assert_eq!(map.get("AIM"), None);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_platform_map_override() {
        let map = PlatformMap::kopete().with("jabberprotocol", Platform::Google);
        assert_eq!(map.get("JabberProtocol"), Some(Platform::Google));
        assert_eq!(map.len(), 3);
        let tags: Vec<_> = map.iter().map(|(t, _)| t).collect();
        assert_eq!(tags, ["ICQProtocol", "MSNProtocol", "jabberprotocol"]);
    }

    #[test]
    fn test_kopete_jabber_spelling() {
        assert_eq!(PlatformMap::kopete().get("JabberProtocol").unwrap().as_str(), "jabber");
    }
}
