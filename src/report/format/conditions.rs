//! Link condition reports printed in constant-width columns.
//!
//! Both kinds slice their rows by column position rather than by
//! whitespace, because wide values in adjacent columns may touch.

use std::sync::OnceLock;

use log::{debug, trace};
use regex::Regex;

use super::sections::{LineWalker, column_table, marker};
use super::{ReportFormat, check_section_count, read_rows, rows_size, write_rows};
use crate::report::codec::cursor::BinaryCursor;
use crate::report::codec::line_format::LineFormat;
use crate::report::codec::scanner::{Row, parse_f32};
use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;
use crate::report::types::models::{AverageConditions as AverageReport, ConditionSlices, Record, TimedTable};

static AVERAGE_MARKER: OnceLock<Regex> = OnceLock::new();
static SLICE_MARKER: OnceLock<Regex> = OnceLock::new();
static AVG_V1: OnceLock<LineFormat> = OnceLock::new();
static AVG_V2: OnceLock<LineFormat> = OnceLock::new();
static COND: OnceLock<LineFormat> = OnceLock::new();

const AVG_V1_DESCRIPTOR: &str = "8i8i8iCfCfAiCfEfEfAc2EfCiEfEfEfEfEfCn1Cn1EfCiFf";

const AVG_V1_NAMES: [&str; 22] = [
    "Link",
    "From",
    "To",
    "Length (km)",
    "Free Speed (kph)",
    "Vehicles",
    "Avg Speed (kph)",
    "Avg Travel Time (s)",
    "Avg Delay (s)",
    "Stops",
    "Avg Density (veh/km)",
    "Flow (vph)",
    "Fuel (l)",
    "HC (g)",
    "CO (g)",
    "NOx (g)",
    "CO2 (kg)",
    "Queue (veh)",
    "Max Queue (veh)",
    "Spillback (s)",
    "Lane Changes",
    "Vehicle-km",
];

fn average_v1() -> &'static LineFormat {
    column_table(&AVG_V1, AVG_V1_DESCRIPTOR, &AVG_V1_NAMES)
}

fn average_v2() -> &'static LineFormat {
    AVG_V2.get_or_init(|| {
        let descriptor = format!("{}EfEfFc2", AVG_V1_DESCRIPTOR);
        let mut names = AVG_V1_NAMES.to_vec();
        names.extend(["PM (g)", "Energy (kWh)", "Toll ($)"]);
        LineFormat::parse_fixed_columns(&descriptor, &names).expect("Invalid built-in column format")
    })
}

/// Layout for a version byte, if known.
fn average_layout(version: u8) -> Option<&'static LineFormat> {
    match version {
        1 => Some(average_v1()),
        2 => Some(average_v2()),
        _ => None,
    }
}

fn condition_row() -> &'static LineFormat {
    column_table(
        &COND,
        "6i6i6i8i8f8f9f9f7c17c2",
        &[
            "Link",
            "From",
            "To",
            "Flow (vph)",
            "Speed (kph)",
            "Density (veh/km)",
            "Travel Time (s)",
            "Delay (s)",
            "Queue (veh)",
            "Stops",
        ],
    )
}

fn parse_columns(kind: FileKind, format: &LineFormat, block: &[(usize, &str)]) -> Result<Vec<Record>> {
    block
        .iter()
        .map(|(index, text)| format.parse_row(kind, &Row::columns(kind, *index, text, format)?))
        .collect()
}

fn seek_marker(walker: &mut LineWalker<'_>, pattern: &Regex) -> Option<usize> {
    while let Some((index, line)) = walker.next_line() {
        if pattern.is_match(line) {
            return Some(index);
        }
    }
    None
}

#[derive(Debug, Clone)]
pub struct AverageSections {
    version: u8,
    rows: Vec<Record>,
}

/// Zero-cost marker struct for average link condition files.
///
/// Two column layouts exist; the row length selects between them.
#[derive(Debug)]
pub struct AverageConditions;

impl ReportFormat for AverageConditions {
    const KIND: FileKind = FileKind::AverageConditions;
    type Sections = AverageSections;
    type Report = AverageReport;

    fn detect(lines: &[&str]) -> Result<Self::Sections> {
        let kind = Self::KIND;
        let mut walker = LineWalker::new(kind, lines);

        let pattern = marker(&AVERAGE_MARKER, r"^\s*AVERAGE LINK CONDITIONS\s*$");
        if seek_marker(&mut walker, pattern).is_none() {
            return Err(walker.malformed(walker.position(), "missing AVERAGE LINK CONDITIONS section"));
        }
        walker.expect_line("column heading")?;
        let block = walker.until_blank();

        // Step 1: every row's length must name the same known layout
        let mut version = None;
        for (index, text) in &block {
            let found = [1u8, 2]
                .into_iter()
                .find(|v| average_layout(*v).is_some_and(|f| f.column_width() == text.len()))
                .ok_or_else(|| {
                    walker.malformed(
                        *index,
                        format!(
                            "row is {} columns wide, expected {} or {}",
                            text.len(),
                            average_v1().column_width(),
                            average_v2().column_width()
                        ),
                    )
                })?;
            match version {
                None => version = Some(found),
                Some(v) if v != found => {
                    return Err(walker.malformed(*index, "rows mix the two column layouts"));
                }
                Some(_) => {}
            }
        }

        // An empty table has no width to go by; store it as version 1.
        let version = version.unwrap_or(1);
        let format = average_layout(version).unwrap_or_else(average_v1);
        trace!("{}: layout version {}, {} bytes per row", kind, version, format.byte_size());

        // Step 2: slice and parse
        let rows = parse_columns(kind, format, &block)?;
        debug!("{}: {} rows (version {})", kind, rows.len(), version);
        Ok(AverageSections { version, rows })
    }

    fn measure(sections: &Self::Sections) -> usize {
        let format = average_layout(sections.version).unwrap_or_else(average_v1);
        1 + 4 + rows_size(format, &sections.rows)
    }

    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        let format = average_layout(sections.version).unwrap_or_else(average_v1);
        cursor.write_u8(sections.version)?;
        write_rows(cursor, format, &sections.rows)
    }

    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report> {
        let offset = cursor.position();
        let version = cursor.read_u8()?;
        let format = average_layout(version).ok_or_else(|| {
            ReportError::malformed_blob(Self::KIND, offset, format!("unknown layout version {}", version))
        })?;
        let rows = read_rows(cursor, format)?;
        Ok(AverageReport { version, rows })
    }
}

/// Zero-cost marker struct for time-sliced link condition files.
#[derive(Debug)]
pub struct Conditions;

impl ReportFormat for Conditions {
    const KIND: FileKind = FileKind::Conditions;
    type Sections = Vec<(f32, Vec<Record>)>;
    type Report = ConditionSlices;

    fn detect(lines: &[&str]) -> Result<Self::Sections> {
        let kind = Self::KIND;
        let pattern = marker(&SLICE_MARKER, r"^\s*LINK CONDITIONS AT TIME:\s*(\S+)\s*$");
        let mut walker = LineWalker::new(kind, lines);
        let mut slices = Vec::new();

        while let Some((index, line)) = walker.next_line() {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let time = parse_f32(kind, index, &caps[1])?;
            walker.expect_line("column heading")?;
            let block = walker.until_blank_or(pattern);
            let rows = parse_columns(kind, condition_row(), &block)?;
            debug!("{}: slice at {} ({} rows)", kind, time, rows.len());
            slices.push((time, rows));
            check_section_count(kind, index, slices.len(), "condition slice")?;
        }

        if slices.is_empty() {
            return Err(walker.malformed(walker.position(), "missing LINK CONDITIONS section"));
        }
        Ok(slices)
    }

    fn measure(sections: &Self::Sections) -> usize {
        2 + sections
            .iter()
            .map(|(_, rows)| 4 + 4 + rows_size(condition_row(), rows))
            .sum::<usize>()
    }

    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        cursor.write_count_i16(sections.len())?;
        for (time, rows) in sections {
            cursor.write_f32(*time)?;
            write_rows(cursor, condition_row(), rows)?;
        }
        Ok(())
    }

    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report> {
        let count = cursor.read_count_i16()?;
        let mut slices = Vec::with_capacity(count);
        for _ in 0..count {
            let time = cursor.read_f32()?;
            let rows = read_rows(cursor, condition_row())?;
            slices.push(TimedTable { time, rows });
        }
        Ok(ConditionSlices { slices })
    }
}
