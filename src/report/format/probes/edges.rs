//! Edge probe log: one record per vehicle traversal of an edge, indexed by
//! edge id.
//!
//! Each record starts with a type byte choosing its layout:
//!
//! | type | layout                         | payload |
//! |------|--------------------------------|---------|
//! | 11   | plain floats (`iifffff`)       | 28      |
//! | 21   | fixed-point (`iifc1c2c1n3bb`)  | 23      |

use std::sync::OnceLock;

use log::warn;
use regex::Regex;

use super::ProbeLayout;
use crate::report::codec::cursor::BinaryCursor;
use crate::report::codec::line_format::LineFormat;
use crate::report::codec::scanner::Row;
use crate::report::format::sections::{marker, table};
use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;
use crate::report::types::filter::ProbeKey;
use crate::report::types::models::{DetailedEdgeProbe, EdgeKey, EdgeProbe, PlainEdgeProbe, Record};

static EDGE_MARKER: OnceLock<Regex> = OnceLock::new();
static PLAIN: OnceLock<LineFormat> = OnceLock::new();
static DETAILED: OnceLock<LineFormat> = OnceLock::new();

fn plain_row() -> &'static LineFormat {
    table(
        &PLAIN,
        "iifffff",
        &[
            "Edge",
            "Vehicle",
            "Time (s)",
            "Travel Time (s)",
            "Speed (kph)",
            "Delay (s)",
            "Fuel (l)",
        ],
    )
}

fn detailed_row() -> &'static LineFormat {
    table(
        &DETAILED,
        "iifc1c2c1n3bb",
        &[
            "Edge",
            "Vehicle",
            "Time (s)",
            "Travel Time (s)",
            "Speed (kph)",
            "Delay (s)",
            "Fuel (l)",
            "Stops",
            "Lane",
        ],
    )
}

/// Payload layout for a type byte.
fn layout(discriminant: u8) -> Option<&'static LineFormat> {
    match discriminant {
        EdgeProbe::PLAIN => Some(plain_row()),
        EdgeProbe::DETAILED => Some(detailed_row()),
        _ => None,
    }
}

/// Reads a type byte and resolves its layout.
fn read_layout(cursor: &mut BinaryCursor<&[u8]>) -> Result<(u8, &'static LineFormat)> {
    let offset = cursor.position();
    let discriminant = cursor.read_u8()?;
    let format = layout(discriminant).ok_or_else(|| {
        warn!("{}: unknown record type {} at offset {}", FileKind::EdgeProbes, discriminant, offset);
        ReportError::UnknownRecordType {
            kind: FileKind::EdgeProbes,
            discriminant,
            offset,
            partial: Vec::new(),
        }
    })?;
    Ok((discriminant, format))
}

#[derive(Debug)]
pub struct EdgeLayout;

impl ProbeLayout for EdgeLayout {
    const KIND: FileKind = FileKind::EdgeProbes;
    type Key = EdgeKey;
    type Row = (u8, Record);
    type Record = EdgeProbe;

    fn marker() -> &'static Regex {
        marker(&EDGE_MARKER, r"^\s*LINK PROBE RECORDS\s*$")
    }

    fn parse_row(index: usize, text: &str) -> Result<(u8, Record)> {
        let row = Row::tokens(index, text);
        let type_token = row
            .fields
            .first()
            .ok_or_else(|| ReportError::malformed_line(Self::KIND, index, "empty probe row"))?;
        let (discriminant, format) = type_token
            .parse::<u8>()
            .ok()
            .and_then(|d| layout(d).map(|f| (d, f)))
            .ok_or_else(|| {
                ReportError::malformed_line(
                    Self::KIND,
                    index,
                    format!(
                        "record type {:?} is neither {} nor {}",
                        type_token,
                        EdgeProbe::PLAIN,
                        EdgeProbe::DETAILED
                    ),
                )
            })?;
        Ok((discriminant, format.parse_row(Self::KIND, &row.tail(1))?))
    }

    fn row_key(row: &(u8, Record)) -> EdgeKey {
        EdgeKey { edge: row.1.int(0) }
    }

    fn row_time(row: &(u8, Record)) -> f32 {
        row.1.float(2)
    }

    fn row_size(row: &(u8, Record)) -> usize {
        1 + layout(row.0).map_or(0, LineFormat::byte_size)
    }

    fn record_size_range() -> (usize, usize) {
        let (plain, detailed) = (plain_row().byte_size(), detailed_row().byte_size());
        (1 + plain.min(detailed), 1 + plain.max(detailed))
    }

    fn write_row(row: &(u8, Record), cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        let (discriminant, record) = row;
        let format = layout(*discriminant).ok_or_else(|| ReportError::UnknownRecordType {
            kind: Self::KIND,
            discriminant: *discriminant,
            offset: cursor.position(),
            partial: Vec::new(),
        })?;
        cursor.write_u8(*discriminant)?;
        format.write_record(cursor, record)
    }

    fn key_size() -> usize {
        4
    }

    fn write_key(key: &EdgeKey, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        cursor.write_i32(key.edge)
    }

    fn read_key(cursor: &mut BinaryCursor<&[u8]>) -> Result<EdgeKey> {
        Ok(EdgeKey {
            edge: cursor.read_i32()?,
        })
    }

    fn filter_key(key: ProbeKey) -> Result<EdgeKey> {
        match key {
            ProbeKey::Edge { edge } => Ok(EdgeKey { edge }),
            ProbeKey::OriginDestination { .. } => Err(ReportError::InvalidFilter(
                "edge probes are keyed by edge, not origin and destination".to_string(),
            )),
        }
    }

    fn read_record(cursor: &mut BinaryCursor<&[u8]>) -> Result<EdgeProbe> {
        let (discriminant, format) = read_layout(cursor)?;
        let r = format.read_record(cursor)?;
        Ok(match discriminant {
            EdgeProbe::PLAIN => EdgeProbe::Plain(PlainEdgeProbe {
                edge: r.int(0),
                vehicle: r.int(1),
                time: r.float(2),
                travel_time: r.float(3),
                speed: r.float(4),
                delay: r.float(5),
                fuel: r.float(6),
            }),
            _ => EdgeProbe::Detailed(DetailedEdgeProbe {
                edge: r.int(0),
                vehicle: r.int(1),
                time: r.float(2),
                travel_time: r.decimal(3),
                speed: r.decimal(4),
                delay: r.decimal(5),
                fuel: r.decimal(6),
                stops: r.int(7),
                lane: r.int(8),
            }),
        })
    }

    fn record_time(record: &EdgeProbe) -> f32 {
        record.time()
    }

    fn skip_group(cursor: &mut BinaryCursor<&[u8]>, count: usize) -> Result<()> {
        for _ in 0..count {
            let (_, format) = read_layout(cursor)?;
            format.skip_record(cursor)?;
        }
        Ok(())
    }

    fn with_partial(error: ReportError, emitted: Vec<EdgeProbe>) -> ReportError {
        match error {
            ReportError::UnknownRecordType {
                kind,
                discriminant,
                offset,
                ..
            } => ReportError::UnknownRecordType {
                kind,
                discriminant,
                offset,
                partial: emitted,
            },
            other => other,
        }
    }
}
