//! Run driver: one contacts pass or one messages pass over an adapter.

use std::io::Write;

use tracing::{debug, info};

use super::dedup::ContactDeduplicator;
use super::output::{JsonlWriter, write_contacts};
use crate::adapter::SourceAdapter;
use crate::error::{ArchiveError, Result};

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Records written to the output.
    pub emitted: usize,
    /// Failed inputs (files, lines or records reported as errors).
    pub failures: usize,
    /// Items read from the adapter before deduplication.
    pub seen: usize,
}

impl RunStats {
    /// A run fails only when nothing was written and something went wrong.
    /// Empty but clean input is a success.
    pub fn check(self) -> Result<Self> {
        if self.emitted == 0 && self.failures > 0 {
            return Err(ArchiveError::NoOutput {
                failures: self.failures,
            });
        }
        Ok(self)
    }

    /// Percentage of sightings collapsed by deduplication.
    pub fn duplicate_ratio(&self) -> f64 {
        if self.seen == 0 {
            return 0.0;
        }
        (1.0 - (self.emitted as f64 / self.seen as f64)) * 100.0
    }
}

/// Collects contacts, deduplicates them and writes one JSON array.
///
/// The array is written even when some inputs failed, as long as at least
/// one contact was found.
pub fn run_contacts<W: Write>(adapter: &dyn SourceAdapter, writer: W) -> Result<RunStats> {
    let mut stats = RunStats::default();
    let mut dedup = ContactDeduplicator::new();

    for item in adapter.contacts()? {
        match item {
            Ok(contact) => {
                stats.seen += 1;
                dedup.observe(contact);
            }
            Err(e) => {
                debug!(error = %e, "counting failed input");
                stats.failures += 1;
            }
        }
    }

    let contacts = dedup.finalize();
    stats.emitted = contacts.len();
    let stats = stats.check()?;

    write_contacts(&contacts, writer)?;
    info!(
        adapter = adapter.name(),
        contacts = stats.emitted,
        sightings = stats.seen,
        duplicate_pct = stats.duplicate_ratio(),
        failures = stats.failures,
        "contacts pass finished"
    );
    Ok(stats)
}

/// Streams messages straight to JSON Lines, in encounter order.
pub fn run_messages<W: Write>(adapter: &dyn SourceAdapter, writer: W) -> Result<RunStats> {
    let mut stats = RunStats::default();
    let mut out = JsonlWriter::new(writer);

    for item in adapter.messages()? {
        match item {
            Ok(message) => {
                stats.seen += 1;
                out.write(&message)?;
            }
            Err(e) => {
                debug!(error = %e, "counting failed input");
                stats.failures += 1;
            }
        }
    }

    stats.emitted = out.written();
    out.finish()?;
    info!(
        adapter = adapter.name(),
        messages = stats.emitted,
        failures = stats.failures,
        "messages pass finished"
    );
    stats.check()
}
