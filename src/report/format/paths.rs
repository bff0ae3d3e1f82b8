//! Shortest-path tree report.
//!
//! Each tree row lists a destination, the path cost, the hop count and then
//! exactly that many link ids, so rows vary in width.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use super::sections::{LineWalker, marker, table};
use super::{ReportFormat, check_section_count};
use crate::report::codec::cursor::BinaryCursor;
use crate::report::codec::line_format::LineFormat;
use crate::report::codec::scanner::{Row, parse_f32, parse_i32};
use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;
use crate::report::types::models::{PathEntry, PathTree, PathTrees, Record};

static TREE_MARKER: OnceLock<Regex> = OnceLock::new();
static ENTRY: OnceLock<LineFormat> = OnceLock::new();

/// The fixed head of a path row; the links follow it.
fn entry_head() -> &'static LineFormat {
    table(&ENTRY, "ifs", &["Destination", "Cost", "Hops"])
}

#[derive(Debug, Clone)]
pub struct TreeSection {
    origin: i32,
    time: f32,
    entries: Vec<(Record, Vec<i32>)>,
}

/// Zero-cost marker struct for path tree files.
#[derive(Debug)]
pub struct Paths;

impl Paths {
    fn parse_entry(index: usize, text: &str) -> Result<(Record, Vec<i32>)> {
        let kind = Self::KIND;
        let head = entry_head();
        let row = Row::tokens(index, text);
        if row.len() < head.field_count() {
            return Err(ReportError::malformed_line(
                kind,
                index,
                format!("expected at least {} fields, found {}", head.field_count(), row.len()),
            ));
        }

        let record = head.parse_row(kind, &row.head(head.field_count()))?;
        let hops = record.int(2);
        let links = row.tail(head.field_count());
        if usize::try_from(hops).ok() != Some(links.len()) {
            return Err(ReportError::malformed_line(
                kind,
                index,
                format!("hop count {} does not match {} link ids", hops, links.len()),
            ));
        }

        let links = links
            .fields
            .iter()
            .map(|token| parse_i32(kind, index, token))
            .collect::<Result<Vec<_>>>()?;
        Ok((record, links))
    }
}

impl ReportFormat for Paths {
    const KIND: FileKind = FileKind::Paths;
    type Sections = Vec<TreeSection>;
    type Report = PathTrees;

    fn detect(lines: &[&str]) -> Result<Self::Sections> {
        let kind = Self::KIND;
        let pattern = marker(
            &TREE_MARKER,
            r"^\s*PATH TREE FOR ORIGIN\s+(\S+)\s+AT TIME:\s*(\S+)\s*$",
        );
        let mut walker = LineWalker::new(kind, lines);
        let mut trees = Vec::new();

        while let Some((index, line)) = walker.next_line() {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let origin = parse_i32(kind, index, &caps[1])?;
            let time = parse_f32(kind, index, &caps[2])?;
            let entries = walker
                .until_blank_or(pattern)
                .into_iter()
                .map(|(row_index, text)| Self::parse_entry(row_index, text))
                .collect::<Result<Vec<_>>>()?;
            debug!("{}: tree for origin {} at {} ({} entries)", kind, origin, time, entries.len());
            trees.push(TreeSection { origin, time, entries });
            check_section_count(kind, index, trees.len(), "path tree")?;
        }

        if trees.is_empty() {
            return Err(walker.malformed(walker.position(), "missing PATH TREE section"));
        }
        Ok(trees)
    }

    fn measure(sections: &Self::Sections) -> usize {
        2 + sections
            .iter()
            .map(|tree| {
                4 + 4
                    + 4
                    + tree
                        .entries
                        .iter()
                        .map(|(_, links)| entry_head().byte_size() + 4 * links.len())
                        .sum::<usize>()
            })
            .sum::<usize>()
    }

    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        cursor.write_count_i16(sections.len())?;
        for tree in sections {
            cursor.write_i32(tree.origin)?;
            cursor.write_f32(tree.time)?;
            cursor.write_count_i32(tree.entries.len())?;
            for (record, links) in &tree.entries {
                entry_head().write_record(cursor, record)?;
                for link in links {
                    cursor.write_i32(*link)?;
                }
            }
        }
        Ok(())
    }

    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report> {
        let count = cursor.read_count_i16()?;
        let mut trees = Vec::with_capacity(count);
        for _ in 0..count {
            let origin = cursor.read_i32()?;
            let time = cursor.read_f32()?;
            let entry_count = cursor.read_count_i32()?;

            let mut entries = Vec::with_capacity(entry_count.min(cursor.remaining() / entry_head().byte_size()));
            for _ in 0..entry_count {
                let offset = cursor.position();
                let head = entry_head().read_record(cursor)?;
                let hops = usize::try_from(head.int(2)).map_err(|_| {
                    ReportError::malformed_blob(Self::KIND, offset, format!("negative hop count {}", head.int(2)))
                })?;
                let mut links = Vec::with_capacity(hops.min(cursor.remaining() / 4));
                for _ in 0..hops {
                    links.push(cursor.read_i32()?);
                }
                entries.push(PathEntry {
                    destination: head.int(0),
                    cost: head.float(1),
                    links,
                });
            }
            trees.push(PathTree { origin, time, entries });
        }
        Ok(PathTrees { trees })
    }
}
