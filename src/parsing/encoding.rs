//! Text decoding with best-effort recovery.
//!
//! Older exports come in whatever code page the originating machine used
//! (`windows-1251` SMS dumps, `koi8-r` transcripts). Decoding never fails: bytes
//! that are invalid in the chosen encoding become U+FFFD and a warning is
//! logged with the file they came from.

use std::fmt;
use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use tracing::warn;

use crate::error::{ArchiveError, Result};

/// Decoder for one source encoding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextDecoder {
    encoding: &'static Encoding,
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self { encoding: UTF_8 }
    }
}

impl fmt::Debug for TextDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextDecoder").field(&self.encoding.name()).finish()
    }
}

impl TextDecoder {
    /// Looks up a WHATWG encoding label such as `utf-8`, `cp1251` or `latin1`.
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| ArchiveError::UnknownEncoding(label.to_string()))
    }

    /// Canonical name of the encoding.
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decodes `bytes`, substituting replacement characters for invalid
    /// sequences. A leading BOM overrides the configured encoding.
    pub fn decode(&self, bytes: &[u8], origin: &Path) -> String {
        let (text, used, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            warn!(
                file = %origin.display(),
                encoding = used.name(),
                "undecodable bytes replaced with U+FFFD"
            );
        }
        text.into_owned()
    }

    /// Reads and decodes a whole file.
    pub fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)?;
        Ok(self.decode(&bytes, path))
    }
}
