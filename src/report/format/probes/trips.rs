//! Trip probe log: one fixed-size record per completed vehicle trip,
//! indexed by origin/destination pair.

use std::sync::OnceLock;

use regex::Regex;

use super::ProbeLayout;
use crate::report::codec::cursor::BinaryCursor;
use crate::report::codec::line_format::LineFormat;
use crate::report::codec::scanner::Row;
use crate::report::format::sections::{marker, table};
use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;
use crate::report::types::filter::ProbeKey;
use crate::report::types::models::{OdPair, Record, TripProbe};

static TRIP_MARKER: OnceLock<Regex> = OnceLock::new();
static TRIP: OnceLock<LineFormat> = OnceLock::new();

fn trip_row() -> &'static LineFormat {
    table(
        &TRIP,
        "iiibfffsf",
        &[
            "Vehicle",
            "Origin",
            "Destination",
            "Class",
            "Departure (s)",
            "Arrival (s)",
            "Distance (km)",
            "Stops",
            "Fuel (l)",
        ],
    )
}

#[derive(Debug)]
pub struct TripLayout;

impl ProbeLayout for TripLayout {
    const KIND: FileKind = FileKind::TripProbes;
    type Key = OdPair;
    type Row = Record;
    type Record = TripProbe;

    fn marker() -> &'static Regex {
        marker(&TRIP_MARKER, r"^\s*TRIP PROBE RECORDS\s*$")
    }

    fn parse_row(index: usize, text: &str) -> Result<Record> {
        trip_row().parse_row(Self::KIND, &Row::tokens(index, text))
    }

    fn row_key(row: &Record) -> OdPair {
        OdPair {
            origin: row.int(1),
            destination: row.int(2),
        }
    }

    fn row_time(row: &Record) -> f32 {
        row.float(4)
    }

    fn row_size(_row: &Record) -> usize {
        trip_row().byte_size()
    }

    fn record_size_range() -> (usize, usize) {
        (trip_row().byte_size(), trip_row().byte_size())
    }

    fn write_row(row: &Record, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        trip_row().write_record(cursor, row)
    }

    fn key_size() -> usize {
        8
    }

    fn write_key(key: &OdPair, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        cursor.write_i32(key.origin)?;
        cursor.write_i32(key.destination)
    }

    fn read_key(cursor: &mut BinaryCursor<&[u8]>) -> Result<OdPair> {
        Ok(OdPair {
            origin: cursor.read_i32()?,
            destination: cursor.read_i32()?,
        })
    }

    fn filter_key(key: ProbeKey) -> Result<OdPair> {
        match key {
            ProbeKey::OriginDestination { origin, destination } => Ok(OdPair { origin, destination }),
            ProbeKey::Edge { .. } => Err(ReportError::InvalidFilter(
                "trip probes are keyed by origin and destination, not edge".to_string(),
            )),
        }
    }

    fn read_record(cursor: &mut BinaryCursor<&[u8]>) -> Result<TripProbe> {
        let r = trip_row().read_record(cursor)?;
        Ok(TripProbe {
            vehicle: r.int(0),
            origin: r.int(1),
            destination: r.int(2),
            class: r.int(3),
            departure: r.float(4),
            arrival: r.float(5),
            distance: r.float(6),
            stops: r.int(7),
            fuel: r.float(8),
        })
    }

    fn record_time(record: &TripProbe) -> f32 {
        record.departure
    }

    fn skip_group(cursor: &mut BinaryCursor<&[u8]>, count: usize) -> Result<()> {
        cursor.advance(count * trip_row().byte_size())
    }
}
