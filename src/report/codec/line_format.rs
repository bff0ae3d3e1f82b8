//! Declarative positional field layouts shared by encoders and decoders.
//!
//! A [`LineFormat`] is built once from a compact descriptor string plus one
//! column name per stored field:
//!
//! ```text
//! descriptor := field*
//! field      := width? code
//! width      := '0'..'9' | 'A'..'Z'         (A = 10 … Z = 35)
//! code       := b | s | i | f | c<digit> | n<digit> | _ | *
//! ```
//!
//! | code | text field              | binary                           |
//! |------|-------------------------|----------------------------------|
//! | `b`  | integer                 | i8                               |
//! | `s`  | integer                 | i16 LE                           |
//! | `i`  | integer                 | i32 LE                           |
//! | `f`  | decimal                 | f32 LE                           |
//! | `cN` | decimal, N places       | 2-byte unsigned fixed-point      |
//! | `nN` | decimal, N places       | 3-byte unsigned fixed-point      |
//! | `_`  | consumed and discarded  | nothing                          |
//! | `*`  | same kind as previous   | same as previous                 |
//!
//! The width only matters when a line is sliced into fixed columns; for
//! whitespace-separated lines it may be omitted.

use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;
use crate::report::types::models::{Record, Value};

use super::cursor::{BinaryCursor, decimal_scale, fixed_sentinel};
use super::scanner::{Row, TextValue, parse_token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Byte,
    Short,
    Int,
    Float,
    Fixed2 { decimals: u8 },
    Fixed3 { decimals: u8 },
    Skip,
}

impl FieldKind {
    /// Bytes the field occupies in a blob.
    pub fn byte_width(&self) -> usize {
        match self {
            FieldKind::Byte => 1,
            FieldKind::Short => 2,
            FieldKind::Int | FieldKind::Float => 4,
            FieldKind::Fixed2 { .. } => 2,
            FieldKind::Fixed3 { .. } => 3,
            FieldKind::Skip => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    /// Column width for fixed-column text; 0 when unset.
    pub width: u8,
    /// Column name; empty for skipped fields.
    pub name: &'static str,
}

/// An immutable, ordered list of field specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    fields: Vec<FieldSpec>,
    byte_size: usize,
    column_width: usize,
}

fn width_of(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        'A'..='Z' => Some(c as u8 - b'A' + 10),
        _ => None,
    }
}

impl LineFormat {
    /// Builds a format from a descriptor and the names of its stored fields.
    ///
    /// # Errors
    /// Returns `InvalidFormatDescriptor` for unknown codes, a width with no
    /// code after it, a fixed-point code without its decimal digit, a
    /// leading `*`, or a name count that differs from the stored field count.
    pub fn parse(descriptor: &str, names: &[&'static str]) -> Result<Self> {
        let invalid = |reason: String| ReportError::InvalidFormatDescriptor {
            descriptor: descriptor.to_string(),
            reason,
        };

        let mut fields: Vec<FieldSpec> = Vec::new();
        let mut names_iter = names.iter().copied();
        let mut chars = descriptor.chars();

        while let Some(c) = chars.next() {
            let (width, code) = match width_of(c) {
                Some(width) => {
                    let code = chars
                        .next()
                        .ok_or_else(|| invalid(format!("width {:?} has no field code after it", c)))?;
                    (width, code)
                }
                None => (0, c),
            };

            let mut decimals = || -> Result<u8> {
                chars
                    .next()
                    .and_then(|d| d.to_digit(10))
                    .map(|d| d as u8)
                    .ok_or_else(|| invalid(format!("fixed-point code {:?} needs a decimal digit", code)))
            };

            let kind = match code {
                'b' => FieldKind::Byte,
                's' => FieldKind::Short,
                'i' => FieldKind::Int,
                'f' => FieldKind::Float,
                'c' => FieldKind::Fixed2 { decimals: decimals()? },
                'n' => FieldKind::Fixed3 { decimals: decimals()? },
                '_' => FieldKind::Skip,
                '*' => fields
                    .last()
                    .map(|prev| prev.kind)
                    .ok_or_else(|| invalid("'*' has no previous field to repeat".to_string()))?,
                other => return Err(invalid(format!("unknown field code {:?}", other))),
            };

            let name = if kind == FieldKind::Skip {
                ""
            } else {
                names_iter
                    .next()
                    .ok_or_else(|| invalid(format!("no name for stored field {}", fields.len() + 1)))?
            };
            fields.push(FieldSpec { kind, width, name });
        }

        if names_iter.next().is_some() {
            return Err(invalid(format!(
                "{} names given for {} stored fields",
                names.len(),
                fields.iter().filter(|f| f.kind != FieldKind::Skip).count()
            )));
        }

        let byte_size = fields.iter().map(|f| f.kind.byte_width()).sum();
        let column_width = fields.iter().map(|f| f.width as usize).sum();
        Ok(Self {
            fields,
            byte_size,
            column_width,
        })
    }

    /// Like [`LineFormat::parse`], additionally requiring a width on every
    /// field so lines can be sliced into columns.
    pub fn parse_fixed_columns(descriptor: &str, names: &[&'static str]) -> Result<Self> {
        let format = Self::parse(descriptor, names)?;
        if let Some(spec) = format.fields.iter().find(|f| f.width == 0) {
            return Err(ReportError::InvalidFormatDescriptor {
                descriptor: descriptor.to_string(),
                reason: format!("field {:?} has no column width", spec.name),
            });
        }
        Ok(format)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of text fields, skipped ones included.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Number of fields that are stored in the blob.
    pub fn stored_count(&self) -> usize {
        self.stored().count()
    }

    /// Bytes one row occupies in a blob.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Sum of the column widths; the length of a full fixed-column line.
    pub fn column_width(&self) -> usize {
        self.column_width
    }

    fn stored(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.kind != FieldKind::Skip)
    }

    /// Parses a text row into named values, dropping skipped fields.
    ///
    /// The row must hold exactly one token per field.
    pub fn parse_row(&self, kind: FileKind, row: &Row<'_>) -> Result<Record> {
        if row.len() != self.fields.len() {
            return Err(ReportError::malformed_line(
                kind,
                row.line,
                format!("expected {} fields, found {}", self.fields.len(), row.len()),
            ));
        }

        let mut record = Record::with_capacity(self.stored_count());
        for (spec, token) in self.fields.iter().zip(&row.fields) {
            let parsed = parse_token(token, spec.kind).map_err(|reason| {
                ReportError::malformed_line(kind, row.line, format!("field {:?}: {}", spec.name, reason))
            })?;
            let value = match (parsed, spec.kind) {
                (TextValue::Skip, _) => continue,
                (TextValue::Int(v), _) => Value::Int(v),
                (TextValue::Float(v), _) => Value::Float(v),
                (TextValue::FixedRaw(raw), FieldKind::Fixed2 { decimals } | FieldKind::Fixed3 { decimals }) => {
                    if raw == fixed_sentinel(spec.kind.byte_width()) {
                        Value::Fixed(-1.0)
                    } else {
                        Value::Fixed(raw as f64 / decimal_scale(decimals) as f64)
                    }
                }
                (TextValue::FixedRaw(raw), _) => Value::Int(raw as i32),
            };
            record.push(spec.name, value);
        }
        Ok(record)
    }

    /// Writes a record's values in format order.
    pub fn write_record<B>(&self, cursor: &mut BinaryCursor<B>, record: &Record) -> Result<()>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        if record.len() != self.stored_count() {
            return Err(ReportError::FieldOverflow {
                kind: cursor.kind(),
                offset: cursor.position(),
                reason: format!(
                    "record has {} values, format stores {}",
                    record.len(),
                    self.stored_count()
                ),
            });
        }

        for (spec, (_, value)) in self.stored().zip(record.iter()) {
            let (kind, offset) = (cursor.kind(), cursor.position());
            let overflow = |reason: String| ReportError::FieldOverflow {
                kind,
                offset,
                reason: format!("field {:?}: {}", spec.name, reason),
            };
            match spec.kind {
                FieldKind::Byte => {
                    let v = i8::try_from(value.as_i32()).map_err(|e| overflow(e.to_string()))?;
                    cursor.write_i8(v)?;
                }
                FieldKind::Short => {
                    let v = i16::try_from(value.as_i32()).map_err(|e| overflow(e.to_string()))?;
                    cursor.write_i16(v)?;
                }
                FieldKind::Int => cursor.write_i32(value.as_i32())?,
                FieldKind::Float => cursor.write_f32(value.as_f32())?,
                FieldKind::Fixed2 { decimals } | FieldKind::Fixed3 { decimals } => {
                    cursor.write_fixed(spec.kind.byte_width(), decimals, value.as_f64())?;
                }
                FieldKind::Skip => {}
            }
        }
        Ok(())
    }

    /// Reads one row's stored fields into a named record.
    pub fn read_record<B: AsRef<[u8]>>(&self, cursor: &mut BinaryCursor<B>) -> Result<Record> {
        let mut record = Record::with_capacity(self.stored_count());
        for spec in self.stored() {
            let value = match spec.kind {
                FieldKind::Byte => Value::Int(cursor.read_i8()? as i32),
                FieldKind::Short => Value::Int(cursor.read_i16()? as i32),
                FieldKind::Int => Value::Int(cursor.read_i32()?),
                FieldKind::Float => Value::Float(cursor.read_f32()?),
                FieldKind::Fixed2 { decimals } | FieldKind::Fixed3 { decimals } => {
                    Value::Fixed(cursor.read_fixed(spec.kind.byte_width(), decimals)?)
                }
                FieldKind::Skip => continue,
            };
            record.push(spec.name, value);
        }
        Ok(record)
    }

    /// Advances past one row without decoding it.
    pub fn skip_record<B: AsRef<[u8]>>(&self, cursor: &mut BinaryCursor<B>) -> Result<()> {
        cursor.advance(self.byte_size)
    }
}
