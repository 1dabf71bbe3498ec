//! Trillian session transcripts.
//!
//! The export root holds one directory per network (`ICQ/`, `IRC/`, `MSN/`,
//! `YAHOO/`) and one `<peer id>.log` per counterpart:
//!
//! ```text
//! Session Start (ICQ - 000001:Alice): Thu Jan 24 21:54:39 2002
//! Alice: Hi Bob
//! Bob: Hi Alice.
//! What a nice day!
//! Session Close (Alice): Thu Jan 24 23:05:59 2002
//! ```
//!
//! Messages carry no time of their own; message `k` of a session is stamped
//! `start + k * interval`. A speaker equal to the counterpart's display name
//! is the counterpart; anyone else is the archive owner, whose id must be
//! supplied (`-u`).

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::adapter::{
    ContactStream, MessageStream, SourceAdapter, SourceFormat, discover_files, per_file, top_level_dir,
};
use crate::config::{PlatformMap, SourceOptions};
use crate::contact::{Contact, PlatformIdentity};
use crate::error::{ArchiveError, Result};
use crate::message::{Message, MessageTarget, Platform};
use crate::parsing::{
    FieldAction, FormatHint, LineClass, TextDecoder, TimestampNormalizer, TimestampPolicy, TranscriptEntry,
    TranscriptGrammar, TranscriptMachine,
};

const FORMAT: &str = "Trillian log";

static SESSION_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Session Start \(\s*([A-Za-z]+)\s*-\s*([^:]*):(.*)\):\s*(.+)$").expect("start pattern is valid")
});
static SESSION_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Session Close \((.*)\):?\s*(.*)$").expect("close pattern is valid"));
static SPEAKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+):(?: (.*))?$").expect("speaker pattern is valid"));

/// Context captured from a `Session Start` marker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrillianSession {
    pub platform: Platform,
    pub peer_id: String,
    pub peer_name: String,
    pub started: DateTime<Utc>,
}

/// Which side of the conversation wrote a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Owner,
    Peer,
}

/// Line grammar for Trillian transcripts.
#[derive(Debug, Clone)]
pub struct TrillianGrammar<'a> {
    platforms: &'a PlatformMap,
    normalizer: &'a TimestampNormalizer,
    interval: Duration,
}

impl<'a> TrillianGrammar<'a> {
    pub fn new(platforms: &'a PlatformMap, normalizer: &'a TimestampNormalizer, interval: Duration) -> Self {
        Self {
            platforms,
            normalizer,
            interval,
        }
    }

    fn parse_start(&self, line: &str, line_number: usize) -> Result<TrillianSession> {
        let caps = SESSION_START
            .captures(line)
            .ok_or_else(|| ArchiveError::malformed_marker(line_number, line))?;

        let platform = self
            .platforms
            .get(&caps[1])
            .ok_or_else(|| ArchiveError::malformed_marker(line_number, line))?;
        let peer_id = caps[2].trim();
        if peer_id.is_empty() {
            return Err(ArchiveError::malformed_marker(line_number, line));
        }
        // An unparseable start time cannot anchor the session.
        let started = self.normalizer.normalize(&caps[4], FormatHint::Trillian)?;

        Ok(TrillianSession {
            platform,
            peer_id: peer_id.to_string(),
            peer_name: caps[3].trim().to_string(),
            started,
        })
    }
}

impl TranscriptGrammar for TrillianGrammar<'_> {
    type Session = TrillianSession;
    type Field = (String, String);
    type Speaker = Speaker;

    fn classify(&self, line: &str, line_number: usize) -> Result<LineClass<TrillianSession, (String, String)>> {
        if line.starts_with("Session Start") {
            return self.parse_start(line, line_number).map(LineClass::Start);
        }
        if line.starts_with("Session Close") {
            return if SESSION_CLOSE.is_match(line) {
                Ok(LineClass::Close)
            } else {
                Err(ArchiveError::malformed_marker(line_number, line))
            };
        }
        Ok(match SPEAKER.captures(line) {
            Some(caps) => LineClass::Field((
                caps[1].to_string(),
                caps.get(2).map_or("", |m| m.as_str()).to_string(),
            )),
            None => LineClass::Text,
        })
    }

    fn field(
        &self,
        session: &mut TrillianSession,
        (name, text): (String, String),
        _line_number: usize,
    ) -> Result<FieldAction<Speaker>> {
        let speaker = if name.trim() == session.peer_name {
            Speaker::Peer
        } else {
            Speaker::Owner
        };
        Ok(FieldAction::Open { speaker, text })
    }

    fn anchor(&self, session: &TrillianSession) -> Option<DateTime<Utc>> {
        Some(session.started)
    }

    fn policy(&self) -> TimestampPolicy {
        TimestampPolicy::SynthesizedInterval(self.interval)
    }
}

/// Adapter for Trillian log directories.
#[derive(Debug, Clone)]
pub struct TrillianAdapter {
    options: SourceOptions,
    decoder: TextDecoder,
    platforms: PlatformMap,
    normalizer: TimestampNormalizer,
}

impl TrillianAdapter {
    pub fn new(options: SourceOptions) -> Result<Self> {
        Ok(Self {
            decoder: options.decoder()?,
            options,
            platforms: PlatformMap::trillian(),
            normalizer: TimestampNormalizer::default(),
        })
    }

    /// Replaces the network directory / marker tag table.
    #[must_use]
    pub fn with_platforms(mut self, platforms: PlatformMap) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn grammar(&self) -> TrillianGrammar<'_> {
        TrillianGrammar::new(&self.platforms, &self.normalizer, self.options.session_interval())
    }

    /// Parses one transcript held in memory.
    pub fn parse_str<'a>(&'a self, content: &str) -> Result<MessageStream<'a>> {
        let owner = self.options.require_owner("Trillian session owner")?;
        Ok(self.transcript_messages(owner, content))
    }

    fn transcript_messages<'a>(&'a self, owner: &'a str, content: &str) -> MessageStream<'a> {
        let lines: Vec<String> = content.lines().map(str::to_owned).collect();
        Box::new(
            TranscriptMachine::new(self.grammar())
                .run(lines)
                .map(move |entry| entry.map(|e| to_message(owner, e))),
        )
    }

    /// `*.log` files inside directories named after a known network.
    fn log_files(&self) -> Result<Vec<PathBuf>> {
        let root = self.options.require_root(FORMAT)?;
        let files = discover_files(root, &["log"])?;
        Ok(files
            .into_iter()
            .filter(|path| top_level_dir(root, path).is_some_and(|dir| self.platforms.get(dir).is_some()))
            .collect())
    }

    fn session_contacts(&self, path: &Path) -> Result<std::vec::IntoIter<Result<Contact>>> {
        let content = self.decoder.read_to_string(path)?;
        let grammar = self.grammar();
        let mut found = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if !line.starts_with("Session Start") {
                continue;
            }
            match grammar.parse_start(line.trim_end(), idx + 1) {
                Ok(session) => found.push(Ok(Contact::from_identity(
                    PlatformIdentity::new(session.peer_id, session.platform).with_display_name(session.peer_name),
                ))),
                Err(e) if e.is_line_recoverable() => {
                    tracing::warn!(file = %path.display(), error = %e, "skipping malformed line");
                }
                Err(e) => {
                    found.push(Err(e));
                    break;
                }
            }
        }
        Ok(found.into_iter())
    }
}

fn to_message(owner: &str, entry: TranscriptEntry<TrillianSession, Speaker>) -> Message {
    let session = entry.session;
    let (from, to) = match entry.speaker {
        Speaker::Peer => (session.peer_id, owner.to_string()),
        Speaker::Owner => (owner.to_string(), session.peer_id),
    };
    let msg = Message::new(entry.ts, session.platform, from, MessageTarget::user(to), entry.text);
    if entry.ts_fallback {
        msg.with_meta("ts_source", "wall_clock")
    } else {
        msg
    }
}

impl SourceAdapter for TrillianAdapter {
    fn name(&self) -> &'static str {
        "Trillian"
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Trillian
    }

    fn contacts(&self) -> Result<ContactStream<'_>> {
        let files = self.log_files()?;
        Ok(per_file(files, move |path| self.session_contacts(path)))
    }

    fn messages(&self) -> Result<MessageStream<'_>> {
        let owner = self.options.require_owner("Trillian session owner")?;
        let files = self.log_files()?;
        Ok(per_file(files, move |path| {
            let content = self.decoder.read_to_string(path)?;
            Ok(self.transcript_messages(owner, &content))
        }))
    }
}
