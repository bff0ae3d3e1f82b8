//! Per-kind report formats.
//!
//! Every kind implements [`ReportFormat`]: a section detector that turns
//! report lines into parsed sections, a measure pass and a write pass that
//! encode those sections into one exactly-sized blob, and a reader that
//! rebuilds the record tree from a blob.
//!
//! # Module Organization
//!
//! - [`network`]: node, edge and signal definitions
//! - [`summary`]: run summary
//! - [`overview`]: overview report (timings, flows, O-D statistics, totals, incidents)
//! - [`conditions`]: average and time-sliced link conditions
//! - [`paths`]: shortest-path trees
//! - [`probes`]: indexed trip and edge probe logs
//!
//! # Pipeline
//!
//! ```text
//! lines ──detect──▶ sections ──measure──▶ size
//!                      │                    │
//!                      └──────write─────────┴──▶ blob ──read──▶ record tree
//! ```

use log::{debug, info};

use crate::report::codec::cursor::BinaryCursor;
use crate::report::codec::line_format::LineFormat;
use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;
use crate::report::types::models::Record;

pub mod conditions;
pub mod network;
pub mod overview;
pub mod paths;
pub mod probes;
pub(crate) mod sections;
pub mod summary;

/// Encoder/decoder pair for one report kind.
pub trait ReportFormat {
    const KIND: FileKind;

    /// Parsed sections produced by the detector.
    type Sections;

    /// The record tree the blob decodes to.
    type Report;

    /// Scans all lines once and parses every section.
    fn detect(lines: &[&str]) -> Result<Self::Sections>;

    /// Exact encoded size of the sections, length bytes and counts included.
    fn measure(sections: &Self::Sections) -> usize;

    /// Writes the sections; must fill exactly `measure` bytes.
    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()>;

    /// Reads a record tree from the front of the cursor.
    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report>;
}

/// Encodes report lines in two passes: measure, then write into a single
/// allocation of exactly the measured size.
///
/// # Errors
/// Any detection, parse or cursor failure aborts the encode; a write pass
/// that ends short of the measured size is a `SizeMismatch`.
pub fn encode<F: ReportFormat>(lines: &[&str]) -> Result<Vec<u8>> {
    info!("Encoding {} report ({} lines)", F::KIND, lines.len());

    let sections = F::detect(lines)?;
    let size = F::measure(&sections);
    debug!("{} report measured at {} bytes", F::KIND, size);

    let mut cursor = BinaryCursor::new(F::KIND, vec![0u8; size]);
    F::write(&sections, &mut cursor)?;
    if !cursor.is_exhausted() {
        return Err(ReportError::SizeMismatch {
            kind: F::KIND,
            expected: size,
            written: cursor.position(),
        });
    }

    info!("{} report encoded: {} bytes", F::KIND, size);
    Ok(cursor.into_inner())
}

/// Decodes a whole blob; trailing bytes are malformed.
pub fn decode<F: ReportFormat>(blob: &[u8]) -> Result<F::Report> {
    info!("Decoding {} blob ({} bytes)", F::KIND, blob.len());
    let mut cursor = BinaryCursor::new(F::KIND, blob);
    let report = F::read(&mut cursor)?;
    cursor.expect_exhausted()?;
    Ok(report)
}

// Helpers for the common "inline count, then rows" shape.

pub(crate) fn rows_size(format: &LineFormat, rows: &[Record]) -> usize {
    rows.len() * format.byte_size()
}

pub(crate) fn write_rows(
    cursor: &mut BinaryCursor<Vec<u8>>,
    format: &LineFormat,
    rows: &[Record],
) -> Result<()> {
    cursor.write_count_i32(rows.len())?;
    rows.iter().try_for_each(|row| format.write_record(cursor, row))
}

pub(crate) fn read_rows(cursor: &mut BinaryCursor<&[u8]>, format: &LineFormat) -> Result<Vec<Record>> {
    let count = cursor.read_count_i32()?;
    // Never trust a count for pre-allocation beyond what the blob can hold.
    let capacity = count.min(cursor.remaining() / format.byte_size().max(1));
    let mut rows = Vec::with_capacity(capacity);
    for _ in 0..count {
        rows.push(format.read_record(cursor)?);
    }
    Ok(rows)
}

/// Parses each `(line index, text)` pair as a whitespace-tokenised row.
pub(crate) fn parse_token_rows(
    kind: FileKind,
    format: &LineFormat,
    lines: &[(usize, &str)],
) -> Result<Vec<Record>> {
    lines
        .iter()
        .map(|(index, text)| {
            let row = crate::report::codec::scanner::Row::tokens(*index, text);
            format.parse_row(kind, &row)
        })
        .collect()
}

/// Fails if a section count does not fit its 16-bit inline length.
pub(crate) fn check_section_count(kind: FileKind, line: usize, count: usize, what: &str) -> Result<()> {
    if count > i16::MAX as usize {
        return Err(ReportError::malformed_line(
            kind,
            line,
            format!("{} {} sections exceed the 16-bit section count", count, what),
        ));
    }
    Ok(())
}
