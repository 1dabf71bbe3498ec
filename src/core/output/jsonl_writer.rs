//! Messages output: JSON Lines, one message per line, written as they arrive.

use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::message::Message;

/// Streams messages as JSON Lines.
///
/// Each message is serialized and written as soon as it is handed over, so
/// the whole run never buffers more than one record.
///
/// ```jsonl
/// {"ts":"2002-01-24T21:54:39Z","platform":"icq","from":"123456","to":{"type":"user","user_id":"bob"},"text":"Hi Bob","meta":{}}
/// ```
pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    written: usize,
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    /// Writes one message followed by a newline.
    pub fn write(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message).map_err(std::io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of messages written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes buffered output and returns the inner writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

/// Writes all `messages` as JSON Lines.
pub fn write_messages<W: Write>(messages: &[Message], writer: W) -> Result<()> {
    let mut out = JsonlWriter::new(writer);
    for msg in messages {
        out.write(msg)?;
    }
    out.finish()?;
    Ok(())
}

/// Same format as [`write_messages`], returned as a string.
pub fn to_jsonl(messages: &[Message]) -> Result<String> {
    let mut buf = Vec::new();
    write_messages(messages, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
