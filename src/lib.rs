//! # simreport
//!
//! A codec for traffic-microsimulation reports.
//! Turns the simulator's text reports (ten file kinds) into compact binary
//! blobs and decodes those blobs back into serde-serialisable record trees,
//! with indexed, filtered decoding for the two high-volume probe logs.
pub mod report;

// Re-export the main types for convenience
pub use report::{
    ArtifactIndex, CodecContext, FileKind, Location, ProbeFilter, ProbeKey, ReportError, ReportRegistry, Result,
    codec::{cursor::BinaryCursor, line_format::LineFormat},
    types::models::{
        EdgeProbe, IndexEntry, ProbePage, ProbeResult, Record, ReportTree, Value,
    },
};
