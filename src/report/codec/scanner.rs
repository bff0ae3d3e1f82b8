//! Splitting report lines into fields and parsing fields into values.
//!
//! Two modes exist because the simulator prints two kinds of lines:
//! free-form numeric lines separated by whitespace, and constant-width
//! printouts where adjacent columns may touch with no separator at all.

use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;

use super::cursor::{decimal_to_raw, fixed_sentinel};
use super::line_format::{FieldKind, LineFormat};

/// The fields of one report line, tagged with the line's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<'a> {
    pub line: usize,
    pub fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    /// Splits on runs of whitespace.
    pub fn tokens(line: usize, text: &'a str) -> Self {
        Self {
            line,
            fields: text.split_whitespace().collect(),
        }
    }

    /// Slices consecutive fixed-width columns described by `format`.
    ///
    /// Every column is trimmed. The line must be exactly as wide as the
    /// format, so a line ending inside a column is rejected, and no column
    /// may be blank.
    pub fn columns(kind: FileKind, line: usize, text: &'a str, format: &LineFormat) -> Result<Self> {
        let total = format.column_width();
        if text.len() != total {
            return Err(ReportError::malformed_line(
                kind,
                line,
                format!("line is {} columns wide, expected {}", text.len(), total),
            ));
        }

        let mut fields = Vec::with_capacity(format.field_count());
        let mut start = 0;
        for spec in format.fields() {
            let end = start + spec.width as usize;
            let column = text
                .get(start..end)
                .ok_or_else(|| ReportError::malformed_line(kind, line, "column boundary splits a character"))?
                .trim();
            if column.is_empty() {
                return Err(ReportError::malformed_line(
                    kind,
                    line,
                    format!("column {:?} (bytes {}..{}) is blank", spec.name, start, end),
                ));
            }
            fields.push(column);
            start = end;
        }
        Ok(Self { line, fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The row without its first `n` fields.
    pub fn tail(&self, n: usize) -> Row<'a> {
        Row {
            line: self.line,
            fields: self.fields.get(n..).unwrap_or_default().to_vec(),
        }
    }

    /// The row restricted to its first `n` fields.
    pub fn head(&self, n: usize) -> Row<'a> {
        Row {
            line: self.line,
            fields: self.fields[..n.min(self.fields.len())].to_vec(),
        }
    }
}

/// A field parsed from text, ready to be stored in its binary kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextValue {
    Int(i32),
    Float(f32),
    FixedRaw(u32),
    Skip,
}

/// True for the "value unavailable" literal: one or more `*`.
pub fn is_unavailable(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b == b'*')
}

/// Parses `token` as a value of `kind`.
///
/// The unavailable literal becomes `-1` for every kind; fixed kinds store
/// it as their all-ones raw value. Errors are plain reasons, the caller
/// attaches kind and line.
pub fn parse_token(token: &str, kind: FieldKind) -> std::result::Result<TextValue, String> {
    if kind == FieldKind::Skip {
        return Ok(TextValue::Skip);
    }
    if is_unavailable(token) {
        return Ok(match kind {
            FieldKind::Float => TextValue::Float(-1.0),
            FieldKind::Fixed2 { .. } | FieldKind::Fixed3 { .. } => {
                TextValue::FixedRaw(fixed_sentinel(kind.byte_width()))
            }
            _ => TextValue::Int(-1),
        });
    }

    match kind {
        FieldKind::Byte => parse_int(token, i8::MIN as i64, i8::MAX as i64),
        FieldKind::Short => parse_int(token, i16::MIN as i64, i16::MAX as i64),
        FieldKind::Int => parse_int(token, i32::MIN as i64, i32::MAX as i64),
        FieldKind::Float => match token.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(TextValue::Float(v)),
            Ok(_) => Err(format!("{:?} is not a finite number", token)),
            Err(_) => Err(format!("{:?} is not a number", token)),
        },
        FieldKind::Fixed2 { decimals } | FieldKind::Fixed3 { decimals } => {
            let sentinel = fixed_sentinel(kind.byte_width()) as u64;
            match decimal_to_raw(token, decimals) {
                Some(raw) if raw < sentinel => Ok(TextValue::FixedRaw(raw as u32)),
                Some(_) => Err(format!(
                    "{:?} exceeds the range of a {}-byte fixed-point field",
                    token,
                    kind.byte_width()
                )),
                None => Err(format!("{:?} is not an unsigned decimal", token)),
            }
        }
        FieldKind::Skip => Ok(TextValue::Skip),
    }
}

fn parse_int(token: &str, min: i64, max: i64) -> std::result::Result<TextValue, String> {
    let value: i64 = token
        .parse()
        .map_err(|_| format!("{:?} is not an integer", token))?;
    if value < min || value > max {
        return Err(format!("{} is outside [{}, {}]", value, min, max));
    }
    Ok(TextValue::Int(value as i32))
}

/// Parses a standalone numeric token (marker times, totals) as `f32`,
/// honouring the unavailable literal.
pub fn parse_f32(kind: FileKind, line: usize, token: &str) -> Result<f32> {
    match parse_token(token, FieldKind::Float) {
        Ok(TextValue::Float(v)) => Ok(v),
        Ok(_) => Ok(-1.0),
        Err(reason) => Err(ReportError::malformed_line(kind, line, reason)),
    }
}

/// Parses a standalone integer token as `i32`.
pub fn parse_i32(kind: FileKind, line: usize, token: &str) -> Result<i32> {
    match parse_token(token, FieldKind::Int) {
        Ok(TextValue::Int(v)) => Ok(v),
        Ok(_) => Ok(-1),
        Err(reason) => Err(ReportError::malformed_line(kind, line, reason)),
    }
}
