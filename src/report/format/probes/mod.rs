//! Indexed probe logs.
//!
//! Probe logs can hold millions of rows, so their blobs start with an index
//! that lets a decoder jump over every record group it is not asked for.
//!
//! # Blob Layout
//!
//! ```text
//! i32 n | n × (key, i32 count, f32 time_min, f32 time_max)
//!       | i32 record count | i32 record bytes | records
//! ```
//!
//! Records are grouped by key in ascending key order (the index order) and
//! sorted by time inside each group, equal times keeping their text order.
//!
//! # Query Modes
//!
//! - No key in the filter: the index itself is returned and no record is
//!   decoded.
//! - A key: the matching group is scanned with skip, stride and a
//!   `[time0, time1)` window, stopping as soon as the page is full or a
//!   record reaches `time1`.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use log::{debug, info, trace};
use regex::Regex;

use super::ReportFormat;
use super::sections::LineWalker;
use crate::report::codec::cursor::BinaryCursor;
use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;
use crate::report::types::filter::{ProbeFilter, ProbeKey};
use crate::report::types::models::{IndexEntry, ProbePage, ProbeResult};

pub mod edges;
pub mod trips;

/// Bytes of an index entry after its key.
const ENTRY_TAIL_SIZE: usize = 4 + 4 + 4;

/// Describes one probe kind to the shared index machinery.
pub trait ProbeLayout {
    const KIND: FileKind;

    /// Grouping key of the index.
    type Key: Copy + Ord + std::fmt::Debug;

    /// A parsed text row, ready to be written.
    type Row;

    /// A decoded record.
    type Record;

    /// Marker line that starts the record table.
    fn marker() -> &'static Regex;

    fn parse_row(index: usize, text: &str) -> Result<Self::Row>;

    fn row_key(row: &Self::Row) -> Self::Key;

    fn row_time(row: &Self::Row) -> f32;

    /// Encoded size of a row, discriminant included.
    fn row_size(row: &Self::Row) -> usize;

    /// Smallest and largest encoded record, discriminant included.
    fn record_size_range() -> (usize, usize);

    fn write_row(row: &Self::Row, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()>;

    /// Encoded size of a key.
    fn key_size() -> usize;

    fn write_key(key: &Self::Key, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()>;

    fn read_key(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Key>;

    /// Maps a filter key to this kind's key type.
    ///
    /// # Errors
    /// Returns `InvalidFilter` when the key has the wrong shape.
    fn filter_key(key: ProbeKey) -> Result<Self::Key>;

    fn read_record(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Record>;

    fn record_time(record: &Self::Record) -> f32;

    /// Moves past `count` records without decoding their fields.
    fn skip_group(cursor: &mut BinaryCursor<&[u8]>, count: usize) -> Result<()>;

    /// Hands the records emitted so far to an error raised mid-scan.
    fn with_partial(error: ReportError, _emitted: Vec<Self::Record>) -> ReportError {
        error
    }
}

/// Adapts a [`ProbeLayout`] to [`ReportFormat`].
///
/// The plain `read` returns the index; keyed queries go through [`decode`].
#[derive(Debug)]
pub struct Indexed<L>(PhantomData<L>);

impl<L: ProbeLayout> ReportFormat for Indexed<L> {
    const KIND: FileKind = L::KIND;
    type Sections = ProbeSections<L::Key, L::Row>;
    type Report = ProbeResult<L::Key, L::Record>;

    fn detect(lines: &[&str]) -> Result<Self::Sections> {
        detect::<L>(lines)
    }

    fn measure(sections: &Self::Sections) -> usize {
        measure::<L>(sections)
    }

    fn write(sections: &Self::Sections, cursor: &mut BinaryCursor<Vec<u8>>) -> Result<()> {
        write::<L>(sections, cursor)
    }

    fn read(cursor: &mut BinaryCursor<&[u8]>) -> Result<Self::Report> {
        scan::<L>(cursor, None, &ProbeFilter::default())
    }
}

pub type TripProbes = Indexed<trips::TripLayout>;
pub type EdgeProbes = Indexed<edges::EdgeLayout>;

/// Text rows grouped under their index entries.
#[derive(Debug, Clone)]
pub struct ProbeSections<K, R> {
    groups: Vec<(IndexEntry<K>, Vec<R>)>,
}

impl<K, R> ProbeSections<K, R> {
    fn record_count(&self) -> usize {
        self.groups.iter().map(|(_, rows)| rows.len()).sum()
    }
}

fn detect<L: ProbeLayout>(lines: &[&str]) -> Result<ProbeSections<L::Key, L::Row>> {
    let mut walker = LineWalker::new(L::KIND, lines);

    let mut found = false;
    while let Some((_, line)) = walker.next_line() {
        if L::marker().is_match(line) {
            found = true;
            break;
        }
    }
    if !found {
        return Err(walker.malformed(walker.position(), "missing probe record section"));
    }

    // Step 1: parse and group rows by key
    let mut grouped: BTreeMap<L::Key, Vec<L::Row>> = BTreeMap::new();
    for (index, text) in walker.until_blank() {
        let row = L::parse_row(index, text)?;
        grouped.entry(L::row_key(&row)).or_default().push(row);
    }

    // Step 2: order each group by time and summarise it
    let mut groups = Vec::with_capacity(grouped.len());
    for (key, mut rows) in grouped {
        rows.sort_by(|a, b| L::row_time(a).total_cmp(&L::row_time(b)));
        let count = u32::try_from(rows.len())
            .ok()
            .filter(|c| i32::try_from(*c).is_ok())
            .ok_or_else(|| walker.malformed(walker.position(), format!("group {:?} has too many records", key)))?;
        let (time_min, time_max) = rows
            .iter()
            .map(L::row_time)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
        trace!("{}: group {:?}: {} records in [{}, {}]", L::KIND, key, count, time_min, time_max);
        groups.push((
            IndexEntry {
                key,
                count,
                time_min,
                time_max,
            },
            rows,
        ));
    }

    let sections = ProbeSections { groups };
    debug!(
        "{}: {} records in {} index groups",
        L::KIND,
        sections.record_count(),
        sections.groups.len()
    );
    Ok(sections)
}

fn records_size<L: ProbeLayout>(sections: &ProbeSections<L::Key, L::Row>) -> usize {
    sections
        .groups
        .iter()
        .flat_map(|(_, rows)| rows.iter())
        .map(L::row_size)
        .sum()
}

fn measure<L: ProbeLayout>(sections: &ProbeSections<L::Key, L::Row>) -> usize {
    4 + sections.groups.len() * (L::key_size() + ENTRY_TAIL_SIZE) + 4 + 4 + records_size::<L>(sections)
}

fn write<L: ProbeLayout>(
    sections: &ProbeSections<L::Key, L::Row>,
    cursor: &mut BinaryCursor<Vec<u8>>,
) -> Result<()> {
    cursor.write_count_i32(sections.groups.len())?;
    for (entry, _) in &sections.groups {
        L::write_key(&entry.key, cursor)?;
        cursor.write_count_i32(entry.count as usize)?;
        cursor.write_f32(entry.time_min)?;
        cursor.write_f32(entry.time_max)?;
    }

    cursor.write_count_i32(sections.record_count())?;
    cursor.write_count_i32(records_size::<L>(sections))?;
    for (_, rows) in &sections.groups {
        for row in rows {
            L::write_row(row, cursor)?;
        }
    }
    Ok(())
}

/// Reads the index and validates the record-region header against it.
fn read_index<L: ProbeLayout>(cursor: &mut BinaryCursor<&[u8]>) -> Result<(Vec<IndexEntry<L::Key>>, usize)> {
    let count = cursor.read_count_i32()?;
    let entry_size = L::key_size() + ENTRY_TAIL_SIZE;
    let mut index = Vec::with_capacity(count.min(cursor.remaining() / entry_size));
    for _ in 0..count {
        let key = L::read_key(cursor)?;
        let offset = cursor.position();
        let count = cursor.read_count_i32()? as u32;
        let time_min = cursor.read_f32()?;
        let time_max = cursor.read_f32()?;
        if time_min > time_max {
            return Err(ReportError::malformed_blob(
                L::KIND,
                offset,
                format!("index entry {:?} has time_min {} after time_max {}", key, time_min, time_max),
            ));
        }
        index.push(IndexEntry {
            key,
            count,
            time_min,
            time_max,
        });
    }

    let header_offset = cursor.position();
    let records = cursor.read_count_i32()?;
    let record_bytes = cursor.read_count_i32()?;

    let indexed: u64 = index.iter().map(|e| e.count as u64).sum();
    if indexed != records as u64 {
        return Err(ReportError::malformed_blob(
            L::KIND,
            header_offset,
            format!("index lists {} records, header declares {}", indexed, records),
        ));
    }
    let (smallest, largest) = L::record_size_range();
    let lowest = records as u64 * smallest as u64;
    let highest = records as u64 * largest as u64;
    if !(lowest..=highest).contains(&(record_bytes as u64)) {
        return Err(ReportError::malformed_blob(
            L::KIND,
            header_offset,
            format!(
                "{} records cannot take {} bytes, expected {}..={}",
                records, record_bytes, lowest, highest
            ),
        ));
    }
    if record_bytes > cursor.remaining() {
        return Err(ReportError::OutOfBounds {
            kind: L::KIND,
            offset: cursor.position(),
            width: record_bytes,
            len: cursor.len(),
        });
    }
    if record_bytes < cursor.remaining() {
        return Err(ReportError::malformed_blob(
            L::KIND,
            cursor.position() + record_bytes,
            format!("{} trailing bytes after the record region", cursor.remaining() - record_bytes),
        ));
    }

    Ok((index, record_bytes))
}

/// Decodes a probe blob under `filter`.
///
/// # Errors
/// - `InvalidFilter` for out-of-range options or a key of the wrong shape.
/// - `OutOfBounds` / `MalformedReport` when the index or record header
///   disagrees with the blob length.
/// - Whatever the layout raises for a bad record, with the records emitted
///   so far attached where the layout supports it.
pub fn decode<L: ProbeLayout>(
    blob: &[u8],
    filter: &ProbeFilter,
) -> Result<ProbeResult<L::Key, L::Record>> {
    filter.validate()?;
    let key = filter.match_key.map(L::filter_key).transpose()?;

    info!("Decoding {} blob ({} bytes)", L::KIND, blob.len());
    let mut cursor = BinaryCursor::new(L::KIND, blob);
    scan::<L>(&mut cursor, key, filter)
}

fn scan<L: ProbeLayout>(
    cursor: &mut BinaryCursor<&[u8]>,
    key: Option<L::Key>,
    filter: &ProbeFilter,
) -> Result<ProbeResult<L::Key, L::Record>> {
    let (index, record_bytes) = read_index::<L>(cursor)?;

    let Some(key) = key else {
        debug!("{}: no key requested, returning {} index entries", L::KIND, index.len());
        cursor.advance(record_bytes)?;
        return Ok(ProbeResult::Index(index));
    };

    let total_matching: u64 = index
        .iter()
        .filter(|e| e.key == key)
        .map(|e| e.count as u64)
        .sum();
    let result_size = filter.result_size(total_matching);
    debug!(
        "{}: key {:?} matches {} records, page of at most {}",
        L::KIND,
        key,
        total_matching,
        result_size
    );

    // Bounded by the record region, which read_index checked against the blob.
    let mut records = Vec::with_capacity(result_size.min(record_bytes / L::record_size_range().0.max(1)));
    if result_size > 0 {
        let mut matched = 0usize;
        'groups: for entry in &index {
            let count = entry.count as usize;
            if entry.key != key || !filter.overlaps(entry.time_min, entry.time_max) {
                if let Err(e) = L::skip_group(cursor, count) {
                    return Err(L::with_partial(e, records));
                }
                continue;
            }

            for _ in 0..count {
                let record = match L::read_record(cursor) {
                    Ok(record) => record,
                    Err(e) => return Err(L::with_partial(e, records)),
                };
                let time = L::record_time(&record);
                if time >= filter.time1 {
                    break 'groups;
                }
                if !filter.in_window(time) {
                    continue;
                }
                if matched >= filter.skip && (matched - filter.skip) % filter.stride == 0 {
                    records.push(record);
                    if records.len() == result_size {
                        break 'groups;
                    }
                }
                matched += 1;
            }
        }
    }

    Ok(ProbeResult::Page(ProbePage {
        total_matching,
        skip: filter.skip,
        stride: filter.stride,
        records,
    }))
}
