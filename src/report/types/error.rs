//! Custom error types for the simreport crate.

use std::fmt;

use thiserror::Error;

use super::file_kind::FileKind;
use super::models::EdgeProbe;

/// Where in the input a malformed shape was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// 0-based index into the report's line sequence.
    Line(usize),
    /// Byte offset into an encoded blob.
    Offset(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(index) => write!(f, "line index {}", index),
            Location::Offset(offset) => write!(f, "byte offset {}", offset),
        }
    }
}

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A cursor read or write would cross the end of its buffer.
    #[error("{kind}: {width}-byte access at offset {offset} exceeds buffer of {len} bytes")]
    OutOfBounds {
        kind: FileKind,
        offset: usize,
        width: usize,
        len: usize,
    },

    /// Text or blob does not have the shape its declared kind requires.
    #[error("{kind}: malformed report at {at}: {reason}")]
    MalformedReport {
        kind: FileKind,
        at: Location,
        reason: String,
    },

    /// A probe record started with a discriminant outside the kind's known set.
    ///
    /// `partial` holds every record the scan emitted before the bad one.
    #[error(
        "{kind}: unknown record type {discriminant} at offset {offset} ({} records decoded before it)",
        .partial.len()
    )]
    UnknownRecordType {
        kind: FileKind,
        discriminant: u8,
        offset: usize,
        partial: Vec<EdgeProbe>,
    },

    /// A value does not fit the binary field it is written to.
    #[error("{kind}: value does not fit its field at offset {offset}: {reason}")]
    FieldOverflow {
        kind: FileKind,
        offset: usize,
        reason: String,
    },

    /// The write pass did not fill the buffer computed by the measure pass.
    #[error("{kind}: size mismatch, measured {expected} bytes but wrote {written}")]
    SizeMismatch {
        kind: FileKind,
        expected: usize,
        written: usize,
    },

    /// A line format descriptor could not be parsed.
    #[error("Invalid line format descriptor {descriptor:?}: {reason}")]
    InvalidFormatDescriptor { descriptor: String, reason: String },

    /// A probe filter is out of range or does not fit the requested kind.
    #[error("Invalid probe filter: {0}")]
    InvalidFilter(String),

    /// A file kind identifier is not one of the ten known kinds.
    #[error("Unknown file kind: {0}")]
    UnknownFileKind(String),

    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub(crate) fn malformed_line(kind: FileKind, line: usize, reason: impl Into<String>) -> Self {
        ReportError::MalformedReport {
            kind,
            at: Location::Line(line),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_blob(kind: FileKind, offset: usize, reason: impl Into<String>) -> Self {
        ReportError::MalformedReport {
            kind,
            at: Location::Offset(offset),
            reason: reason.into(),
        }
    }
}

/// A convenience `Result` type alias using the crate's `ReportError` type.
pub type Result<T> = std::result::Result<T, ReportError>;
