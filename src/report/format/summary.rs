//! Run summary report: labelled scalar statistics and a per-class table.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use super::sections::{LineWalker, is_blank, marker, table};
use super::{ReportFormat, check_section_count, parse_token_rows};
use crate::report::codec::cursor::{BinaryCursor, string_size};
use crate::report::codec::line_format::LineFormat;
use crate::report::codec::scanner::parse_f32;
use crate::report::types::error::Result;
use crate::report::types::file_kind::FileKind;
use crate::report::types::models::{Record, RunSummary, SummaryStat};

static STATISTICS_MARKER: OnceLock<Regex> = OnceLock::new();
static CLASSES_MARKER: OnceLock<Regex> = OnceLock::new();
static CLASS: OnceLock<LineFormat> = OnceLock::new();

fn statistics_marker() -> &'static Regex {
    marker(&STATISTICS_MARKER, r"^\s*SIMULATION SUMMARY\s*$")
}

fn classes_marker() -> &'static Regex {
    marker(&CLASSES_MARKER, r"^\s*VEHICLE CLASS SUMMARY\s*$")
}

fn class_row() -> &'static LineFormat {
    table(
        &CLASS,
        "biffffc2",
        &[
            "Class",
            "Trips",
            "Vehicle-km",
            "Vehicle-hours",
            "Avg Speed (kph)",
            "Fuel (l)",
            "Stops/Veh",
        ],
    )
}

#[derive(Debug, Clone)]
pub struct SummarySections {
    statistics: Vec<(String, f32)>,
    classes: Vec<Record>,
}

/// Skips lines up to and including the one matching `pattern`.
fn seek(walker: &mut LineWalker<'_>, pattern: &Regex, what: &str) -> Result<usize> {
    while let Some((index, line)) = walker.next_line() {
        if pattern.is_match(line) {
            return Ok(index);
        }
    }
    Err(walker.malformed(walker.position(), format!("missing {} section", what)))
}

/// Zero-cost marker struct for run summary files.
#[derive(Debug)]
pub struct Summary;

impl ReportFormat for Summary {
    const KIND: FileKind = FileKind::Summary;
    type Sections = SummarySections;
    type Report = RunSummary;

    fn detect(lines: &[&str]) -> Result<Self::Sections> {
        let mut walker = LineWalker::new(Self::KIND, lines);

        // Step 1: labelled statistics
        let start = seek(&mut walker, statistics_marker(), "SIMULATION SUMMARY")?;
        let mut statistics = Vec::new();
        for (index, line) in walker.until_blank() {
            let (label, value) = line
                .rsplit_once(':')
                .ok_or_else(|| walker.malformed(index, "expected `label : value`"))?;
            let value = value.trim();
            if value.split_whitespace().count() != 1 {
                return Err(walker.malformed(index, format!("expected one value after ':', found {:?}", value)));
            }
            statistics.push((label.trim().to_string(), parse_f32(Self::KIND, index, value)?));
        }
        check_section_count(Self::KIND, start, statistics.len(), "statistic")?;
        debug!("{}: {} statistics", Self::KIND, statistics.len());

        // Step 2: per-class table after its heading line
        let start = seek(&mut walker, classes_marker(), "VEHICLE CLASS SUMMARY")?;
        walker.expect_line("class table heading")?;
        let rows = walker.until_blank();
        let classes = parse_token_rows(Self::KIND, class_row(), &rows)?;
        check_section_count(Self::KIND, start, classes.len(), "class row")?;
        debug!("{}: {} class rows", Self::KIND, classes.len());

        if let Some((index, _)) = walker.peek().filter(|(_, line)| !is_blank(line)) {
            debug!("{}: ignoring trailing text from line {}", Self::KIND, index);
        }

        Ok(SummarySections { statistics, classes })
    }

    fn measure(sections: &Self::Sections) -> usize {
        2 + sections
            .statistics
            .iter()
            .map(|(label, _)| string_size(label) + 4)
            .sum::<usize>()
            + 2
            + sections.classes.len() * class_row().byte_size()
    }

    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        cursor.write_count_i16(sections.statistics.len())?;
        for (label, value) in &sections.statistics {
            cursor.write_string(label)?;
            cursor.write_f32(*value)?;
        }
        cursor.write_count_i16(sections.classes.len())?;
        sections
            .classes
            .iter()
            .try_for_each(|row| class_row().write_record(cursor, row))
    }

    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report> {
        let count = cursor.read_count_i16()?;
        let mut statistics = Vec::with_capacity(count);
        for _ in 0..count {
            let label = cursor.read_string()?;
            let value = cursor.read_f32()?;
            statistics.push(SummaryStat { label, value });
        }

        let count = cursor.read_count_i16()?;
        let mut classes = Vec::with_capacity(count);
        for _ in 0..count {
            classes.push(class_row().read_record(cursor)?);
        }
        Ok(RunSummary { statistics, classes })
    }
}
