//! Network definition reports: nodes, edges and signal plans.
//!
//! All three start with a free-text title line followed by a count line.
//! Node and edge rows may carry trailing free-text tag words, which are
//! stored as a length-prefixed string after each row.

use std::sync::OnceLock;

use log::debug;

use super::sections::{LineWalker, table};
use super::{ReportFormat, parse_token_rows};
use crate::report::codec::cursor::{BinaryCursor, string_size};
use crate::report::codec::line_format::LineFormat;
use crate::report::codec::scanner::{Row, parse_i32};
use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;
use crate::report::types::models::{
    Edge, EdgeNetwork, Node, NodeNetwork, Phase, Record, Signal, SignalPlan,
};

static NODE_HEADER: OnceLock<LineFormat> = OnceLock::new();
static NODE: OnceLock<LineFormat> = OnceLock::new();
static EDGE_HEADER: OnceLock<LineFormat> = OnceLock::new();
static EDGE: OnceLock<LineFormat> = OnceLock::new();
static SIGNAL: OnceLock<LineFormat> = OnceLock::new();
static PHASE: OnceLock<LineFormat> = OnceLock::new();

fn node_header() -> &'static LineFormat {
    table(&NODE_HEADER, "iff", &["Count", "X Scale", "Y Scale"])
}

fn node_row() -> &'static LineFormat {
    table(&NODE, "iffbs", &["Id", "X", "Y", "Type", "Zone"])
}

fn edge_header() -> &'static LineFormat {
    table(&EDGE_HEADER, "iff", &["Count", "Length Scale", "Speed Scale"])
}

fn edge_row() -> &'static LineFormat {
    table(
        &EDGE,
        "iiifffbffsbb",
        &[
            "Id",
            "From",
            "To",
            "Length",
            "Free Speed",
            "Saturation Flow",
            "Lanes",
            "Speed At Capacity",
            "Jam Density",
            "Signal",
            "Phase 1",
            "Phase 2",
        ],
    )
}

fn signal_row() -> &'static LineFormat {
    table(&SIGNAL, "iffs", &["Id", "Cycle", "Offset", "Phases"])
}

fn phase_row() -> &'static LineFormat {
    table(&PHASE, "bfff", &["Phase", "Green", "Amber", "All Red"])
}

/// A titled table whose header line declares the row count and whose rows
/// may end in free-text tag words.
#[derive(Debug, Clone)]
pub struct TaggedTable {
    title: String,
    header: Record,
    rows: Vec<(Record, String)>,
}

impl TaggedTable {
    fn detect(kind: FileKind, lines: &[&str], header: &LineFormat, row: &LineFormat) -> Result<Self> {
        let mut walker = LineWalker::new(kind, lines);

        let (_, title) = walker.expect_line("title line")?;
        let (header_line, header_text) = walker.expect_line("count line")?;
        let header_record = header.parse_row(kind, &Row::tokens(header_line, header_text))?;
        let count = usize::try_from(header_record.int(0))
            .map_err(|_| walker.malformed(header_line, "negative row count"))?;

        let width = row.field_count();
        let rows = walker
            .take_exact(count, "table row")?
            .into_iter()
            .map(|(index, text)| {
                let tokens = Row::tokens(index, text);
                if tokens.len() < width {
                    return Err(ReportError::malformed_line(
                        kind,
                        index,
                        format!("expected at least {} fields, found {}", width, tokens.len()),
                    ));
                }
                let record = row.parse_row(kind, &tokens.head(width))?;
                Ok((record, tokens.tail(width).fields.join(" ")))
            })
            .collect::<Result<Vec<_>>>()?;

        walker.expect_blank_rest()?;
        debug!("{}: title {:?}, {} rows", kind, title, rows.len());

        Ok(Self {
            title: title.to_string(),
            header: header_record,
            rows,
        })
    }

    fn measure(&self, header: &LineFormat, row: &LineFormat) -> usize {
        string_size(&self.title)
            + header.byte_size()
            + self
                .rows
                .iter()
                .map(|(_, tag)| row.byte_size() + string_size(tag))
                .sum::<usize>()
    }

    fn write(
        &self,
        cursor: &mut BinaryCursor<Vec<u8>>,
        header: &LineFormat,
        row: &LineFormat,
    ) -> Result<()> {
        cursor.write_string(&self.title)?;
        header.write_record(cursor, &self.header)?;
        for (record, tag) in &self.rows {
            row.write_record(cursor, record)?;
            cursor.write_string(tag)?;
        }
        Ok(())
    }

    /// Reads title, header and tagged rows back as raw records.
    fn read(
        cursor: &mut BinaryCursor<&[u8]>,
        header: &LineFormat,
        row: &LineFormat,
    ) -> Result<(String, Record, Vec<(Record, Option<String>)>)> {
        let title = cursor.read_string()?;
        let offset = cursor.position();
        let header_record = header.read_record(cursor)?;
        let count = usize::try_from(header_record.int(0)).map_err(|_| {
            ReportError::malformed_blob(cursor.kind(), offset, format!("negative count {}", header_record.int(0)))
        })?;

        let mut rows = Vec::with_capacity(count.min(cursor.remaining() / row.byte_size().max(1)));
        for _ in 0..count {
            let record = row.read_record(cursor)?;
            let tag = cursor.read_string()?;
            rows.push((record, Some(tag).filter(|t| !t.is_empty())));
        }
        Ok((title, header_record, rows))
    }
}

/// Zero-cost marker struct for node definition files.
#[derive(Debug)]
pub struct Nodes;

impl ReportFormat for Nodes {
    const KIND: FileKind = FileKind::Nodes;
    type Sections = TaggedTable;
    type Report = NodeNetwork;

    fn detect(lines: &[&str]) -> Result<Self::Sections> {
        TaggedTable::detect(Self::KIND, lines, node_header(), node_row())
    }

    fn measure(sections: &Self::Sections) -> usize {
        sections.measure(node_header(), node_row())
    }

    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        sections.write(cursor, node_header(), node_row())
    }

    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report> {
        let (title, header, rows) = TaggedTable::read(cursor, node_header(), node_row())?;
        let nodes = rows
            .into_iter()
            .map(|(r, tag)| Node {
                id: r.int(0),
                x: r.float(1),
                y: r.float(2),
                node_type: r.int(3),
                zone: r.int(4),
                tag,
            })
            .collect();
        Ok(NodeNetwork {
            title,
            x_scale: header.float(1),
            y_scale: header.float(2),
            nodes,
        })
    }
}

/// Zero-cost marker struct for edge (link) definition files.
#[derive(Debug)]
pub struct Edges;

impl ReportFormat for Edges {
    const KIND: FileKind = FileKind::Edges;
    type Sections = TaggedTable;
    type Report = EdgeNetwork;

    fn detect(lines: &[&str]) -> Result<Self::Sections> {
        TaggedTable::detect(Self::KIND, lines, edge_header(), edge_row())
    }

    fn measure(sections: &Self::Sections) -> usize {
        sections.measure(edge_header(), edge_row())
    }

    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        sections.write(cursor, edge_header(), edge_row())
    }

    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report> {
        let (title, header, rows) = TaggedTable::read(cursor, edge_header(), edge_row())?;
        let edges = rows
            .into_iter()
            .map(|(r, tag)| Edge {
                id: r.int(0),
                from: r.int(1),
                to: r.int(2),
                length: r.float(3),
                free_speed: r.float(4),
                saturation_flow: r.float(5),
                lanes: r.int(6),
                speed_at_capacity: r.float(7),
                jam_density: r.float(8),
                signal: r.int(9),
                phase_1: r.int(10),
                phase_2: r.int(11),
                tag,
            })
            .collect();
        Ok(EdgeNetwork {
            title,
            length_scale: header.float(1),
            speed_scale: header.float(2),
            edges,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SignalSections {
    title: String,
    signals: Vec<(Record, Vec<Record>)>,
}

/// Zero-cost marker struct for signal plan files.
#[derive(Debug)]
pub struct Signals;

impl ReportFormat for Signals {
    const KIND: FileKind = FileKind::Signals;
    type Sections = SignalSections;
    type Report = SignalPlan;

    fn detect(lines: &[&str]) -> Result<Self::Sections> {
        let mut walker = LineWalker::new(Self::KIND, lines);

        let (_, title) = walker.expect_line("title line")?;
        let (count_line, count_text) = walker.expect_line("signal count line")?;
        let count_row = Row::tokens(count_line, count_text);
        if count_row.len() != 1 {
            return Err(walker.malformed(count_line, format!("expected 1 field, found {}", count_row.len())));
        }
        let count = usize::try_from(parse_i32(Self::KIND, count_line, count_row.fields[0])?)
            .map_err(|_| walker.malformed(count_line, "negative signal count"))?;

        // Each signal takes at least one line.
        let mut signals = Vec::with_capacity(count.min(lines.len()));
        for _ in 0..count {
            let (index, text) = walker.expect_line("signal line")?;
            let signal = signal_row().parse_row(Self::KIND, &Row::tokens(index, text))?;
            let phase_count = usize::try_from(signal.int(3))
                .map_err(|_| walker.malformed(index, "negative phase count"))?;
            let phase_lines = walker.take_exact(phase_count, "phase line")?;
            let phases = parse_token_rows(Self::KIND, phase_row(), &phase_lines)?;
            signals.push((signal, phases));
        }

        walker.expect_blank_rest()?;
        debug!("{}: {} signals", Self::KIND, signals.len());

        Ok(SignalSections {
            title: title.to_string(),
            signals,
        })
    }

    fn measure(sections: &Self::Sections) -> usize {
        string_size(&sections.title)
            + 4
            + sections
                .signals
                .iter()
                .map(|(_, phases)| signal_row().byte_size() + phases.len() * phase_row().byte_size())
                .sum::<usize>()
    }

    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        cursor.write_string(&sections.title)?;
        cursor.write_count_i32(sections.signals.len())?;
        for (signal, phases) in &sections.signals {
            signal_row().write_record(cursor, signal)?;
            for phase in phases {
                phase_row().write_record(cursor, phase)?;
            }
        }
        Ok(())
    }

    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report> {
        let title = cursor.read_string()?;
        let count = cursor.read_count_i32()?;

        let mut signals = Vec::with_capacity(count.min(cursor.remaining() / signal_row().byte_size()));
        for _ in 0..count {
            let offset = cursor.position();
            let signal = signal_row().read_record(cursor)?;
            let phase_count = usize::try_from(signal.int(3)).map_err(|_| {
                ReportError::malformed_blob(Self::KIND, offset, format!("negative phase count {}", signal.int(3)))
            })?;

            let mut phases = Vec::with_capacity(phase_count.min(cursor.remaining() / phase_row().byte_size()));
            for _ in 0..phase_count {
                let p = phase_row().read_record(cursor)?;
                phases.push(Phase {
                    phase: p.int(0),
                    green: p.float(1),
                    amber: p.float(2),
                    all_red: p.float(3),
                });
            }

            signals.push(Signal {
                id: signal.int(0),
                cycle: signal.float(1),
                offset: signal.float(2),
                phases,
            });
        }
        Ok(SignalPlan { title, signals })
    }
}
