//! Format-independent parsing building blocks shared by the source adapters.

pub mod encoding;
pub mod markup;
pub mod timestamp;
pub mod transcript;

pub use encoding::TextDecoder;
pub use markup::{extract_links, extract_mentions, strip_markup};
pub use timestamp::{FormatHint, TimestampNormalizer, TimestampPattern};
pub use transcript::{
    FieldAction, LineClass, TimestampPolicy, Transcript, TranscriptEntry, TranscriptGrammar, TranscriptMachine,
    TranscriptState,
};
