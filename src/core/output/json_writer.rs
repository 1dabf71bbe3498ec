//! Contacts output: one pretty-printed JSON array.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::contact::Contact;
use crate::error::Result;

/// Writes contacts to `writer` as a pretty-printed JSON array.
///
/// # Format
/// ```json
/// [
///   {
///     "name": "Alice",
///     "platform_ids": [
///       {"id": "123456", "platform": "icq", "avatar": "", "meta": {}}
///     ]
///   }
/// ]
/// ```
pub fn write_contacts<W: Write>(contacts: &[Contact], writer: W) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, contacts).map_err(std::io::Error::from)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes contacts to a file at `output_path`.
pub fn write_contacts_file(contacts: &[Contact], output_path: impl AsRef<Path>) -> Result<()> {
    write_contacts(contacts, File::create(output_path)?)
}

/// Same format as [`write_contacts`], returned as a string.
pub fn to_contacts_json(contacts: &[Contact]) -> Result<String> {
    Ok(serde_json::to_string_pretty(contacts).map_err(std::io::Error::from)?)
}
