//! Stateful parser for session-delimited, free-form text transcripts.
//!
//! Two source formats share the same shape: a start line opens a session (or
//! record), prefixed lines open messages (or set labeled fields), unprefixed
//! lines continue the open message, and a close line ends the session.
//! [`TranscriptMachine`] implements that shape once; a [`TranscriptGrammar`]
//! supplies the line patterns and the timestamp policy.
//!
//! ```text
//!            Start                 Field(Open)
//!   IDLE ───────────▶ IN_SESSION ─────────────▶ IN_MESSAGE ◀─┐
//!    ▲                    │                       │  │  │     │ Field(Open): emit, reopen
//!    │       Close        │          Close: emit  │  │  └─────┘
//!    └────────────────────┴───────────────────────┘  │ Text: append
//!                                                    └──────▶
//! ```
//!
//! - Whitespace-only lines are ignored in every state.
//! - A start line while a session is open flushes the open message first.
//! - End of input flushes the open message.
//! - A message's timestamp is fixed when it opens.
//! - Malformed marker/header lines are skipped without changing state; any
//!   other error ends the file after flushing what is open.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::{debug, trace, warn};

use crate::error::{ArchiveError, Result};

/// Observable state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptState {
    /// Outside any session.
    Idle,
    /// Inside a session, no message open.
    InSession,
    /// Accumulating lines for an open message.
    InMessage,
}

/// How a grammar classifies one non-empty line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineClass<S, F> {
    /// Session or record start, with the context it carries.
    Start(S),
    /// Speaker-prefixed or labeled line.
    Field(F),
    /// Session close or record separator.
    Close,
    /// Anything else: continuation text.
    Text,
}

/// What a field line does to the current session.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAction<P> {
    /// Annotates the session (e.g. a record's `Date:`), opens nothing.
    Header,
    /// Opens a new message with the given speaker and first line of text.
    Open { speaker: P, text: String },
    /// The line only looks like a field; append it to the open message.
    Text,
}

/// How message timestamps are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// `anchor + index * interval`, for formats without per-message times.
    SynthesizedInterval(Duration),
    /// The anchor itself, for formats with one explicit time per record.
    ExplicitPerRecord,
}

/// Line grammar plugged into [`TranscriptMachine`].
pub trait TranscriptGrammar {
    /// Context captured at session start and carried into every entry.
    type Session: Clone;
    /// Data captured from a field line.
    type Field;
    /// Resolved author of a message.
    type Speaker;

    /// Classifies a non-empty, right-trimmed line.
    ///
    /// Return [`ArchiveError::MalformedSessionMarker`] or
    /// [`ArchiveError::MalformedRecordHeader`] to have the line skipped; any
    /// other error abandons the file.
    fn classify(&self, line: &str, line_number: usize) -> Result<LineClass<Self::Session, Self::Field>>;

    /// Applies a field line to the current session.
    fn field(
        &self,
        session: &mut Self::Session,
        field: Self::Field,
        line_number: usize,
    ) -> Result<FieldAction<Self::Speaker>>;

    /// Instant the session's timestamps are derived from, if known.
    fn anchor(&self, session: &Self::Session) -> Option<DateTime<Utc>>;

    fn policy(&self) -> TimestampPolicy;
}

/// One reconstructed message.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry<S, P> {
    /// Session context at the time the message was closed.
    pub session: S,
    pub speaker: P,
    /// Message body, continuation lines joined with `\n`.
    pub text: String,
    pub ts: DateTime<Utc>,
    /// 0-based position of the message within its session.
    pub index: usize,
    /// 1-based line number where the message started.
    pub line: usize,
    /// `true` when `ts` is wall-clock time because the source had none.
    pub ts_fallback: bool,
}

struct OpenMessage<P> {
    speaker: P,
    text: String,
    index: usize,
    line: usize,
    ts: DateTime<Utc>,
    ts_fallback: bool,
}

impl<P> OpenMessage<P> {
    fn push_line(&mut self, line: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);
    }
}

enum Cursor<S, P> {
    Idle,
    InSession {
        session: S,
        next_index: usize,
    },
    InMessage {
        session: S,
        next_index: usize,
        open: OpenMessage<P>,
    },
}

/// The three-state transcript parser.
///
/// Drive it line by line with [`step`](Self::step) and [`finish`](Self::finish),
/// or hand it all lines with [`run`](Self::run) to get an iterator.
pub struct TranscriptMachine<G: TranscriptGrammar> {
    grammar: G,
    cursor: Cursor<G::Session, G::Speaker>,
    line_number: usize,
}

impl<G: TranscriptGrammar> TranscriptMachine<G> {
    pub fn new(grammar: G) -> Self {
        Self {
            grammar,
            cursor: Cursor::Idle,
            line_number: 0,
        }
    }

    pub fn state(&self) -> TranscriptState {
        match self.cursor {
            Cursor::Idle => TranscriptState::Idle,
            Cursor::InSession { .. } => TranscriptState::InSession,
            Cursor::InMessage { .. } => TranscriptState::InMessage,
        }
    }

    /// Feeds one line. Returns the message it closed, if any.
    ///
    /// On error the state is left as it was before the line.
    pub fn step(&mut self, line: &str) -> Result<Option<TranscriptEntry<G::Session, G::Speaker>>> {
        self.line_number += 1;
        let line = line.trim_end();
        if line.trim_start().is_empty() {
            return Ok(None);
        }

        match self.grammar.classify(line, self.line_number)? {
            LineClass::Start(session) => {
                let flushed = self.close_message();
                if flushed.is_none() && matches!(self.cursor, Cursor::InSession { .. }) {
                    debug!(line = self.line_number, "session started without closing the previous one");
                }
                self.cursor = Cursor::InSession {
                    session,
                    next_index: 0,
                };
                Ok(flushed)
            }
            LineClass::Close => {
                let flushed = self.close_message();
                self.cursor = Cursor::Idle;
                Ok(flushed)
            }
            LineClass::Field(field) => self.apply_field(field, line),
            LineClass::Text => {
                self.push_text(line);
                Ok(None)
            }
        }
    }

    /// Flushes the open message at end of input and returns to `Idle`.
    pub fn finish(&mut self) -> Option<TranscriptEntry<G::Session, G::Speaker>> {
        let flushed = self.close_message();
        self.cursor = Cursor::Idle;
        flushed
    }

    /// Runs the machine over `lines`.
    pub fn run<I>(self, lines: I) -> Transcript<G, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Transcript {
            machine: self,
            lines: lines.into_iter(),
            pending_error: None,
            skipped: 0,
            done: false,
        }
    }

    fn push_text(&mut self, line: &str) {
        if let Cursor::InMessage { open, .. } = &mut self.cursor {
            open.push_line(line);
        } else {
            trace!(line = self.line_number, "ignoring text outside a message");
        }
    }

    fn apply_field(&mut self, field: G::Field, line: &str) -> Result<Option<TranscriptEntry<G::Session, G::Speaker>>> {
        let line_number = self.line_number;
        let action = match &mut self.cursor {
            Cursor::Idle => {
                trace!(line = line_number, "ignoring field outside a session");
                return Ok(None);
            }
            Cursor::InSession { session, .. } | Cursor::InMessage { session, .. } => {
                self.grammar.field(session, field, line_number)?
            }
        };

        let (speaker, text) = match action {
            FieldAction::Header => return Ok(None),
            FieldAction::Text => {
                self.push_text(line);
                return Ok(None);
            }
            FieldAction::Open { speaker, text } => (speaker, text),
        };

        let (ts, ts_fallback) = match &self.cursor {
            Cursor::InSession { session, next_index } | Cursor::InMessage { session, next_index, .. } => {
                self.timestamp(session, *next_index, line_number)?
            }
            Cursor::Idle => return Ok(None),
        };

        let flushed = self.close_message();
        if let Cursor::InSession { session, next_index } = std::mem::replace(&mut self.cursor, Cursor::Idle) {
            self.cursor = Cursor::InMessage {
                session,
                next_index: next_index + 1,
                open: OpenMessage {
                    speaker,
                    text,
                    index: next_index,
                    line: line_number,
                    ts,
                    ts_fallback,
                },
            };
        }
        Ok(flushed)
    }

    /// Emits the open message, leaving the machine in `InSession`.
    fn close_message(&mut self) -> Option<TranscriptEntry<G::Session, G::Speaker>> {
        match std::mem::replace(&mut self.cursor, Cursor::Idle) {
            Cursor::InMessage {
                session,
                next_index,
                open,
            } => {
                let entry = Self::build_entry(&session, open);
                self.cursor = Cursor::InSession { session, next_index };
                Some(entry)
            }
            other => {
                self.cursor = other;
                None
            }
        }
    }

    /// Timestamp for the message at `index`, fixed when the message opens.
    fn timestamp(&self, session: &G::Session, index: usize, line: usize) -> Result<(DateTime<Utc>, bool)> {
        match (self.grammar.policy(), self.grammar.anchor(session)) {
            (TimestampPolicy::SynthesizedInterval(interval), Some(anchor)) => i32::try_from(index)
                .ok()
                .and_then(|steps| interval.checked_mul(steps))
                .and_then(|offset| anchor.checked_add_signed(offset))
                .map(|ts| (ts, false))
                .ok_or_else(|| {
                    ArchiveError::invalid_format(
                        "transcript",
                        format!("timestamp of message {index} at line {line} overflows the representable range"),
                    )
                }),
            (TimestampPolicy::ExplicitPerRecord, Some(anchor)) => Ok((anchor, false)),
            (_, None) => {
                warn!(line, "no timestamp for message; substituting current wall-clock time");
                Ok((Utc::now().trunc_subsecs(0), true))
            }
        }
    }

    fn build_entry(session: &G::Session, open: OpenMessage<G::Speaker>) -> TranscriptEntry<G::Session, G::Speaker> {
        TranscriptEntry {
            session: session.clone(),
            speaker: open.speaker,
            text: open.text,
            ts: open.ts,
            index: open.index,
            line: open.line,
            ts_fallback: open.ts_fallback,
        }
    }
}

/// Iterator produced by [`TranscriptMachine::run`].
///
/// Yields each message as it is closed. Recoverable line errors are logged and
/// counted; the first fatal error is yielded once (after flushing the open
/// message) and ends the iteration.
pub struct Transcript<G: TranscriptGrammar, I> {
    machine: TranscriptMachine<G>,
    lines: I,
    pending_error: Option<ArchiveError>,
    skipped: usize,
    done: bool,
}

impl<G: TranscriptGrammar, I> Transcript<G, I> {
    /// Number of malformed lines skipped so far.
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }

    pub fn state(&self) -> TranscriptState {
        self.machine.state()
    }
}

impl<G, I> Iterator for Transcript<G, I>
where
    G: TranscriptGrammar,
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Result<TranscriptEntry<G::Session, G::Speaker>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            self.done = true;
            return Some(Err(err));
        }
        if self.done {
            return None;
        }

        for line in self.lines.by_ref() {
            match self.machine.step(line.as_ref()) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => {}
                Err(err) if err.is_line_recoverable() => {
                    warn!(error = %err, "skipping malformed line");
                    self.skipped += 1;
                }
                Err(err) => {
                    if let Some(entry) = self.machine.finish() {
                        self.pending_error = Some(err);
                        return Some(Ok(entry));
                    }
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }

        self.done = true;
        self.machine.finish().map(Ok)
    }
}
