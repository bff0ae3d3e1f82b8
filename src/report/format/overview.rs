//! Overview report.
//!
//! The overview is a loose collection of sections that may appear in any
//! order with arbitrary text between them:
//!
//! | marker                                  | rows            | ends at          |
//! |-----------------------------------------|-----------------|------------------|
//! | `SIGNAL TIMING AT TIME: <t>`            | TIMING          | blank line       |
//! | `LINK FLOW SUMMARY AT TIME: <t>`        | FLOW            | blank line       |
//! | `O-D STATISTICS FOR VEHICLE CLASS <c>`  | OD              | blank line       |
//! | `O-D STATISTICS FOR ALL VEHICLES`       | OD (once)       | blank line       |
//! | `NETWORK TOTALS`                        | 8 scalar lines  | fixed count      |
//! | `INCIDENTS`                             | INCIDENT (once) | token count ≠ 5  |

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use super::sections::{LineWalker, marker, table};
use super::{ReportFormat, check_section_count, parse_token_rows, read_rows, rows_size, write_rows};
use crate::report::codec::cursor::BinaryCursor;
use crate::report::codec::line_format::{FieldKind, LineFormat};
use crate::report::codec::scanner::{TextValue, parse_f32, parse_token};
use crate::report::types::error::Result;
use crate::report::types::file_kind::FileKind;
use crate::report::types::models::{ClassTable, NetworkTotals, Overview as OverviewReport, Record, TimedTable};

static TIMING_MARKER: OnceLock<Regex> = OnceLock::new();
static FLOW_MARKER: OnceLock<Regex> = OnceLock::new();
static CLASS_OD_MARKER: OnceLock<Regex> = OnceLock::new();
static OVERALL_OD_MARKER: OnceLock<Regex> = OnceLock::new();
static TOTALS_MARKER: OnceLock<Regex> = OnceLock::new();
static INCIDENTS_MARKER: OnceLock<Regex> = OnceLock::new();

static TIMING: OnceLock<LineFormat> = OnceLock::new();
static FLOW: OnceLock<LineFormat> = OnceLock::new();
static OD: OnceLock<LineFormat> = OnceLock::new();
static INCIDENT: OnceLock<LineFormat> = OnceLock::new();

fn timing_row() -> &'static LineFormat {
    table(
        &TIMING,
        "ibffff",
        &["Signal", "Phase", "Green (s)", "Amber (s)", "Cycle (s)", "Offset (s)"],
    )
}

fn flow_row() -> &'static LineFormat {
    table(
        &FLOW,
        "iiffc1",
        &["Link", "Flow (vph)", "Speed (kph)", "Density (veh/km)", "Queue (veh)"],
    )
}

fn od_row() -> &'static LineFormat {
    table(
        &OD,
        "iiiff",
        &["Origin", "Destination", "Trips", "Avg Travel Time (s)", "Avg Distance (km)"],
    )
}

fn incident_row() -> &'static LineFormat {
    table(
        &INCIDENT,
        "iiffb",
        &["Incident", "Link", "Start (s)", "End (s)", "Lanes Blocked"],
    )
}

#[derive(Debug, Clone, Default)]
pub struct OverviewSections {
    timings: Vec<(f32, Vec<Record>)>,
    flows: Vec<(f32, Vec<Record>)>,
    classes: Vec<(i16, Vec<Record>)>,
    overall: Option<Vec<Record>>,
    totals: Option<NetworkTotals>,
    incidents: Option<Vec<Record>>,
}

/// Zero-cost marker struct for overview files.
#[derive(Debug)]
pub struct Overview;

impl Overview {
    fn detect_totals(walker: &mut LineWalker<'_>) -> Result<NetworkTotals> {
        let lines = walker.take_exact(NetworkTotals::FIELD_COUNT, "network totals line")?;
        let mut values = [0f32; NetworkTotals::FIELD_COUNT];
        for (slot, (index, line)) in values.iter_mut().zip(lines) {
            let token = line
                .split_whitespace()
                .last()
                .ok_or_else(|| walker.malformed(index, "network totals line is blank"))?;
            *slot = parse_f32(walker.kind(), index, token)?;
        }
        Ok(NetworkTotals::from_values(values))
    }
}

impl ReportFormat for Overview {
    const KIND: FileKind = FileKind::Overview;
    type Sections = OverviewSections;
    type Report = OverviewReport;

    fn detect(lines: &[&str]) -> Result<Self::Sections> {
        let timing = marker(&TIMING_MARKER, r"^\s*SIGNAL TIMING AT TIME:\s*(\S+)\s*$");
        let flow = marker(&FLOW_MARKER, r"^\s*LINK FLOW SUMMARY AT TIME:\s*(\S+)\s*$");
        let class_od = marker(&CLASS_OD_MARKER, r"^\s*O-D STATISTICS FOR VEHICLE CLASS\s+(\S+)\s*$");
        let overall_od = marker(&OVERALL_OD_MARKER, r"^\s*O-D STATISTICS FOR ALL VEHICLES\s*$");
        let totals = marker(&TOTALS_MARKER, r"^\s*NETWORK TOTALS\s*$");
        let incidents = marker(&INCIDENTS_MARKER, r"^\s*INCIDENTS\s*$");

        let kind = Self::KIND;
        let mut walker = LineWalker::new(kind, lines);
        let mut sections = OverviewSections::default();

        while let Some((index, line)) = walker.next_line() {
            if let Some(caps) = timing.captures(line) {
                let time = parse_f32(kind, index, &caps[1])?;
                let rows = parse_token_rows(kind, timing_row(), &walker.until_blank())?;
                debug!("{}: signal timing at {} ({} rows)", kind, time, rows.len());
                sections.timings.push((time, rows));
                check_section_count(kind, index, sections.timings.len(), "signal timing")?;
            } else if let Some(caps) = flow.captures(line) {
                let time = parse_f32(kind, index, &caps[1])?;
                let rows = parse_token_rows(kind, flow_row(), &walker.until_blank())?;
                debug!("{}: link flows at {} ({} rows)", kind, time, rows.len());
                sections.flows.push((time, rows));
                check_section_count(kind, index, sections.flows.len(), "link flow")?;
            } else if let Some(caps) = class_od.captures(line) {
                let class = match parse_token(&caps[1], FieldKind::Short) {
                    Ok(TextValue::Int(v)) => v as i16,
                    Ok(_) => -1,
                    Err(reason) => return Err(walker.malformed(index, format!("vehicle class: {}", reason))),
                };
                let rows = parse_token_rows(kind, od_row(), &walker.until_blank())?;
                debug!("{}: O-D statistics for class {} ({} rows)", kind, class, rows.len());
                sections.classes.push((class, rows));
                check_section_count(kind, index, sections.classes.len(), "O-D class")?;
            } else if overall_od.is_match(line) {
                if sections.overall.is_some() {
                    return Err(walker.malformed(index, "duplicate O-D STATISTICS FOR ALL VEHICLES section"));
                }
                let rows = parse_token_rows(kind, od_row(), &walker.until_blank())?;
                debug!("{}: overall O-D statistics ({} rows)", kind, rows.len());
                sections.overall = Some(rows);
            } else if totals.is_match(line) {
                if sections.totals.is_some() {
                    return Err(walker.malformed(index, "duplicate NETWORK TOTALS section"));
                }
                sections.totals = Some(Self::detect_totals(&mut walker)?);
                debug!("{}: network totals", kind);
            } else if incidents.is_match(line) {
                if sections.incidents.is_some() {
                    return Err(walker.malformed(index, "duplicate INCIDENTS section"));
                }
                // The line that ends the table is left for the marker match.
                let block = walker.while_columns(incident_row().field_count());
                let rows = parse_token_rows(kind, incident_row(), &block)?;
                check_section_count(kind, index, rows.len(), "incident row")?;
                debug!("{}: {} incidents", kind, rows.len());
                sections.incidents = Some(rows);
            }
        }

        if sections.totals.is_none() {
            return Err(walker.malformed(walker.position(), "missing NETWORK TOTALS section"));
        }
        Ok(sections)
    }

    fn measure(sections: &Self::Sections) -> usize {
        let timed = |tables: &[(f32, Vec<Record>)], format: &LineFormat| -> usize {
            2 + tables
                .iter()
                .map(|(_, rows)| 4 + 4 + rows_size(format, rows))
                .sum::<usize>()
        };

        timed(&sections.timings[..], timing_row())
            + timed(&sections.flows[..], flow_row())
            + 2
            + sections
                .classes
                .iter()
                .map(|(_, rows)| 2 + 4 + rows_size(od_row(), rows))
                .sum::<usize>()
            + 4
            + rows_size(od_row(), sections.overall.as_deref().unwrap_or_default())
            + 4 * NetworkTotals::FIELD_COUNT
            + 2
            + rows_size(incident_row(), sections.incidents.as_deref().unwrap_or_default())
    }

    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        for (tables, format) in [(&sections.timings, timing_row()), (&sections.flows, flow_row())] {
            cursor.write_count_i16(tables.len())?;
            for (time, rows) in tables {
                cursor.write_f32(*time)?;
                write_rows(cursor, format, rows)?;
            }
        }

        cursor.write_count_i16(sections.classes.len())?;
        for (class, rows) in &sections.classes {
            cursor.write_i16(*class)?;
            write_rows(cursor, od_row(), rows)?;
        }

        write_rows(cursor, od_row(), sections.overall.as_deref().unwrap_or_default())?;

        for value in sections.totals.unwrap_or_default().to_values() {
            cursor.write_f32(value)?;
        }

        let incidents = sections.incidents.as_deref().unwrap_or_default();
        cursor.write_count_i16(incidents.len())?;
        incidents
            .iter()
            .try_for_each(|row| incident_row().write_record(cursor, row))
    }

    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report> {
        let mut timed = |format: &LineFormat| -> Result<Vec<TimedTable>> {
            let count = cursor.read_count_i16()?;
            let mut tables = Vec::with_capacity(count);
            for _ in 0..count {
                let time = cursor.read_f32()?;
                let rows = read_rows(cursor, format)?;
                tables.push(TimedTable { time, rows });
            }
            Ok(tables)
        };
        let signal_timings = timed(timing_row())?;
        let link_flow_periods = timed(flow_row())?;

        let count = cursor.read_count_i16()?;
        let mut od_stats_by_class = Vec::with_capacity(count);
        for _ in 0..count {
            let class = cursor.read_i16()? as i32;
            let rows = read_rows(cursor, od_row())?;
            od_stats_by_class.push(ClassTable { class, rows });
        }

        let od_stats_overall = read_rows(cursor, od_row())?;

        let mut totals = [0f32; NetworkTotals::FIELD_COUNT];
        for slot in totals.iter_mut() {
            *slot = cursor.read_f32()?;
        }

        let count = cursor.read_count_i16()?;
        let mut incidents = Vec::with_capacity(count);
        for _ in 0..count {
            incidents.push(incident_row().read_record(cursor)?);
        }

        Ok(OverviewReport {
            signal_timings,
            link_flow_periods,
            od_stats_by_class,
            od_stats_overall,
            network_totals: NetworkTotals::from_values(totals),
            incidents,
        })
    }
}
