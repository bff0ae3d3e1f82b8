//! Forward-only line walking shared by the section detectors.
//!
//! Each detector follows the same state model: seek a marker line, take the
//! section's lines according to its termination rule, go back to seeking.
//! [`LineWalker`] only moves forward; a line may be peeked before deciding
//! whether it belongs to the current section, but once consumed it is never
//! handed out again.

use std::sync::OnceLock;

use regex::Regex;

use crate::report::codec::line_format::LineFormat;
use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;

/// Returns the cached marker pattern, compiling it on first use.
pub(crate) fn marker(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid section marker pattern"))
}

/// Returns the cached line format, building it on first use.
pub(crate) fn table(
    cell: &'static OnceLock<LineFormat>,
    descriptor: &str,
    names: &[&'static str],
) -> &'static LineFormat {
    cell.get_or_init(|| LineFormat::parse(descriptor, names).expect("Invalid built-in line format"))
}

/// Like [`table`] for layouts sliced into fixed columns.
pub(crate) fn column_table(
    cell: &'static OnceLock<LineFormat>,
    descriptor: &str,
    names: &[&'static str],
) -> &'static LineFormat {
    cell.get_or_init(|| {
        LineFormat::parse_fixed_columns(descriptor, names).expect("Invalid built-in column format")
    })
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// A cursor over report lines that never moves backwards.
pub(crate) struct LineWalker<'a> {
    lines: &'a [&'a str],
    pos: usize,
    kind: FileKind,
}

impl<'a> LineWalker<'a> {
    pub fn new(kind: FileKind, lines: &'a [&'a str]) -> Self {
        Self { lines, pos: 0, kind }
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Index of the next line, or the line count once exhausted.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Option<(usize, &'a str)> {
        self.lines.get(self.pos).map(|line| (self.pos, *line))
    }

    pub fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let item = self.peek()?;
        self.pos += 1;
        Some(item)
    }

    /// Takes the next line or fails naming what was expected there.
    pub fn expect_line(&mut self, what: &str) -> Result<(usize, &'a str)> {
        let at = self.pos;
        self.next_line().ok_or_else(|| {
            ReportError::malformed_line(self.kind, at, format!("expected {}, found end of input", what))
        })
    }

    /// Takes exactly `count` lines; fewer remaining is malformed.
    pub fn take_exact(&mut self, count: usize, what: &str) -> Result<Vec<(usize, &'a str)>> {
        (0..count).map(|_| self.expect_line(what)).collect()
    }

    /// Takes lines up to the next blank line (consumed) or end of input.
    pub fn until_blank(&mut self) -> Vec<(usize, &'a str)> {
        let mut block = Vec::new();
        while let Some((index, line)) = self.next_line() {
            if is_blank(line) {
                break;
            }
            block.push((index, line));
        }
        block
    }

    /// Like [`LineWalker::until_blank`], also stopping before a line that
    /// starts the next section.
    pub fn until_blank_or(&mut self, next_marker: &Regex) -> Vec<(usize, &'a str)> {
        let mut block = Vec::new();
        while let Some((index, line)) = self.peek() {
            if next_marker.is_match(line) {
                break;
            }
            self.pos += 1;
            if is_blank(line) {
                break;
            }
            block.push((index, line));
        }
        block
    }

    /// Takes lines while they split into exactly `columns` tokens; the
    /// first line with another token count is left for the caller.
    pub fn while_columns(&mut self, columns: usize) -> Vec<(usize, &'a str)> {
        let mut block = Vec::new();
        while let Some((index, line)) = self.peek() {
            if line.split_whitespace().count() != columns {
                break;
            }
            self.pos += 1;
            block.push((index, line));
        }
        block
    }

    /// Fails unless every remaining line is blank.
    pub fn expect_blank_rest(&mut self) -> Result<()> {
        while let Some((index, line)) = self.next_line() {
            if !is_blank(line) {
                return Err(ReportError::malformed_line(
                    self.kind,
                    index,
                    "unexpected content after the last section",
                ));
            }
        }
        Ok(())
    }

    pub fn malformed(&self, line: usize, reason: impl Into<String>) -> ReportError {
        ReportError::malformed_line(self.kind, line, reason)
    }
}
