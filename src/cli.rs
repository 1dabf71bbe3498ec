//! Command-line interface definition using clap.
//!
//! This module defines:
//! - [`Args`] - CLI argument structure
//! - [`Source`] - Supported export formats, as accepted on the command line
//! - [`Command`] - Which pass to run
//!
//! ```rust
//! use chatarchive::cli::Source;
//! use chatarchive::SourceFormat;
//!
//! let format: SourceFormat = Source::GoogleChat.into();
//! assert_eq!(format.as_str(), "google-chat");
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::adapter::SourceFormat;
use crate::config::{DEFAULT_SESSION_INTERVAL_SECS, SourceOptions};

/// Normalize personal chat archive exports into canonical contacts (JSON)
/// and messages (JSON Lines) on stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatarchive")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatarchive trillian messages -d Trillian/logs -u 000001 > messages.jsonl
    chatarchive sms contacts -d phone/ > contacts.json
    chatarchive skype messages -f messages.json --contacts contacts.csv
    chatarchive google-chat messages -d \"Google Chat/Groups/\"
    chatarchive kopete contacts -f contactlist.xml")]
pub struct Args {
    /// Export format
    #[arg(value_enum)]
    pub source: Source,

    /// What to extract
    #[arg(value_enum)]
    pub command: Command,

    /// Export root directory
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Export file
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Separate contact list export
    #[arg(long = "contacts", value_name = "FILE")]
    pub contacts: Option<PathBuf>,

    /// Text encoding of the input (WHATWG label)
    #[arg(short = 'e', long, default_value = "utf-8")]
    pub encoding: String,

    /// Archive owner's id on the source platform
    #[arg(short = 'u', long = "user", value_name = "ID")]
    pub user: Option<String>,

    /// Seconds between synthesized message timestamps in transcripts (at most a day)
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_SESSION_INTERVAL_SECS,
        value_parser = clap::value_parser!(u32).range(0..=86_400)
    )]
    pub interval: u32,

    /// Log progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Builds adapter options from the parsed flags.
    pub fn source_options(&self) -> SourceOptions {
        let mut options = SourceOptions::new()
            .with_encoding(self.encoding.clone())
            .with_session_interval(self.interval);
        if let Some(dir) = &self.directory {
            options = options.with_root(dir);
        }
        if let Some(file) = &self.file {
            options = options.with_file(file);
        }
        if let Some(contacts) = &self.contacts {
            options = options.with_contacts_file(contacts);
        }
        if let Some(user) = &self.user {
            options = options.with_owner(user.clone());
        }
        options
    }
}

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Trillian `*.log` session transcripts
    Trillian,

    /// SMS dumps (TXT, CSV, XML) and phone books
    Sms,

    /// Skype `messages.json` export
    Skype,

    /// Skype database dump as JSON lines
    #[value(name = "skypelog", alias = "skype-log")]
    #[serde(rename = "skypelog")]
    SkypeLog,

    /// Telegram JSONL history
    #[value(alias = "tg")]
    #[serde(alias = "tg")]
    Telegram,

    /// Google Chat takeout groups
    #[value(alias = "gchat")]
    #[serde(alias = "gchat")]
    GoogleChat,

    /// Kopete contact list and XML history
    Kopete,
}

impl From<Source> for SourceFormat {
    fn from(source: Source) -> SourceFormat {
        match source {
            Source::Trillian => SourceFormat::Trillian,
            Source::Sms => SourceFormat::Sms,
            Source::Skype => SourceFormat::Skype,
            Source::SkypeLog => SourceFormat::SkypeLog,
            Source::Telegram => SourceFormat::Telegram,
            Source::GoogleChat => SourceFormat::GoogleChat,
            Source::Kopete => SourceFormat::Kopete,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(SourceFormat::from(*self).as_str())
    }
}

/// Which pass to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Deduplicated contacts as a JSON array
    Contacts,
    /// Messages as JSON Lines
    Messages,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Contacts => write!(f, "contacts"),
            Command::Messages => write!(f, "messages"),
        }
    }
}
