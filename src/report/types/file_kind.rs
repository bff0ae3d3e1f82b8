//! The closed set of report kinds this codec understands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ReportError;

/// One of the ten report categories produced by the simulator.
///
/// The kind selects the section detector, encoder and decoder used for a
/// file. It is always known before the codec is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Overview,
    AverageConditions,
    Conditions,
    Paths,
    Summary,
    TripProbes,
    EdgeProbes,
    Nodes,
    Edges,
    Signals,
}

impl FileKind {
    pub const ALL: [FileKind; 10] = [
        FileKind::Overview,
        FileKind::AverageConditions,
        FileKind::Conditions,
        FileKind::Paths,
        FileKind::Summary,
        FileKind::TripProbes,
        FileKind::EdgeProbes,
        FileKind::Nodes,
        FileKind::Edges,
        FileKind::Signals,
    ];

    /// The snake_case identifier used by collaborators and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Overview => "overview",
            FileKind::AverageConditions => "average_conditions",
            FileKind::Conditions => "conditions",
            FileKind::Paths => "paths",
            FileKind::Summary => "summary",
            FileKind::TripProbes => "trip_probes",
            FileKind::EdgeProbes => "edge_probes",
            FileKind::Nodes => "nodes",
            FileKind::Edges => "edges",
            FileKind::Signals => "signals",
        }
    }

    /// True for the two high-volume kinds decoded through an embedded index.
    pub fn is_indexed(&self) -> bool {
        matches!(self, FileKind::TripProbes | FileKind::EdgeProbes)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        FileKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ReportError::UnknownFileKind(s.to_string()))
    }
}
