//! Record trees produced by the decoders.
//!
//! This module defines the fundamental types returned to callers:
//! - Generic ordered rows ([`Record`]) for wide tabular sections
//! - Typed trees for network definitions, summaries and path trees
//! - Probe records, index entries and paginated probe results
//!
//! Every tree serialises with serde; field names of generic rows come from
//! the line format tables verbatim (e.g. `"Avg Speed (kph)"`).

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A single decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// byte, short and int fields.
    Int(i32),
    /// IEEE-754 single precision fields.
    Float(f32),
    /// Fixed-point fields, already divided by their decimal scale.
    Fixed(f64),
}

impl Value {
    pub fn as_i32(&self) -> i32 {
        match *self {
            Value::Int(v) => v,
            Value::Float(v) => v as i32,
            Value::Fixed(v) => v as i32,
        }
    }

    pub fn as_f32(&self) -> f32 {
        match *self {
            Value::Int(v) => v as f32,
            Value::Float(v) => v,
            Value::Fixed(v) => v as f32,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Int(v) => v as f64,
            Value::Float(v) => v as f64,
            Value::Fixed(v) => v,
        }
    }

    /// True when the field held the `*` sentinel in the source text.
    pub fn is_unavailable(&self) -> bool {
        self.as_f64() == -1.0
    }
}

/// An ordered row of named values.
///
/// Serialises as a JSON object whose keys keep the column order of the
/// line format the row was decoded with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(&'static str, Value)>,
}

impl Record {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: &'static str, value: Value) {
        self.fields.push((name, value));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks a value up by its column name.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| *value)
    }

    /// Value at a column position; the positions follow the line format.
    pub fn value(&self, index: usize) -> Option<Value> {
        self.fields.get(index).map(|(_, value)| *value)
    }

    pub(crate) fn int(&self, index: usize) -> i32 {
        self.value(index).map(|v| v.as_i32()).unwrap_or_default()
    }

    pub(crate) fn float(&self, index: usize) -> f32 {
        self.value(index).map(|v| v.as_f32()).unwrap_or_default()
    }

    pub(crate) fn decimal(&self, index: usize) -> f64 {
        self.value(index).map(|v| v.as_f64()).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Value)> + '_ {
        self.fields.iter().copied()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A table of rows captured at one simulation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedTable {
    pub time: f32,
    pub rows: Vec<Record>,
}

// ---------------------------------------------------------------------------
// Network definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: i32,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub node_type: i32,
    pub zone: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeNetwork {
    pub title: String,
    pub x_scale: f32,
    pub y_scale: f32,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: i32,
    pub from: i32,
    pub to: i32,
    pub length: f32,
    pub free_speed: f32,
    pub saturation_flow: f32,
    pub lanes: i32,
    pub speed_at_capacity: f32,
    pub jam_density: f32,
    pub signal: i32,
    pub phase_1: i32,
    pub phase_2: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeNetwork {
    pub title: String,
    pub length_scale: f32,
    pub speed_scale: f32,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phase {
    pub phase: i32,
    pub green: f32,
    pub amber: f32,
    pub all_red: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub id: i32,
    pub cycle: f32,
    pub offset: f32,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalPlan {
    pub title: String,
    pub signals: Vec<Signal>,
}

// ---------------------------------------------------------------------------
// Result reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStat {
    pub label: String,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub statistics: Vec<SummaryStat>,
    pub classes: Vec<Record>,
}

/// O-D statistics for one vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassTable {
    pub class: i32,
    pub rows: Vec<Record>,
}

/// Network-wide scalar totals of the overview report.
///
/// The report prints these as eight consecutive lines; their meaning is
/// purely positional, in the order of the fields below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetworkTotals {
    #[serde(rename = "Vehicles Entered")]
    pub vehicles_entered: f32,
    #[serde(rename = "Vehicles Exited")]
    pub vehicles_exited: f32,
    #[serde(rename = "Vehicles In Network")]
    pub vehicles_in_network: f32,
    #[serde(rename = "Vehicle-km")]
    pub vehicle_km: f32,
    #[serde(rename = "Vehicle-hours")]
    pub vehicle_hours: f32,
    #[serde(rename = "Avg Speed (kph)")]
    pub avg_speed_kph: f32,
    #[serde(rename = "Total Stops")]
    pub total_stops: f32,
    #[serde(rename = "Fuel (l)")]
    pub fuel_litres: f32,
}

impl NetworkTotals {
    pub const FIELD_COUNT: usize = 8;

    pub fn from_values(values: [f32; Self::FIELD_COUNT]) -> Self {
        let [
            vehicles_entered,
            vehicles_exited,
            vehicles_in_network,
            vehicle_km,
            vehicle_hours,
            avg_speed_kph,
            total_stops,
            fuel_litres,
        ] = values;
        Self {
            vehicles_entered,
            vehicles_exited,
            vehicles_in_network,
            vehicle_km,
            vehicle_hours,
            avg_speed_kph,
            total_stops,
            fuel_litres,
        }
    }

    pub fn to_values(&self) -> [f32; Self::FIELD_COUNT] {
        [
            self.vehicles_entered,
            self.vehicles_exited,
            self.vehicles_in_network,
            self.vehicle_km,
            self.vehicle_hours,
            self.avg_speed_kph,
            self.total_stops,
            self.fuel_litres,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub signal_timings: Vec<TimedTable>,
    pub link_flow_periods: Vec<TimedTable>,
    pub od_stats_by_class: Vec<ClassTable>,
    pub od_stats_overall: Vec<Record>,
    pub network_totals: NetworkTotals,
    pub incidents: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageConditions {
    /// 1 for the 269-column layout, 2 for the 312-column layout.
    pub version: u8,
    pub rows: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionSlices {
    pub slices: Vec<TimedTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathEntry {
    pub destination: i32,
    pub cost: f32,
    pub links: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathTree {
    pub origin: i32,
    pub time: f32,
    pub entries: Vec<PathEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathTrees {
    pub trees: Vec<PathTree>,
}

// ---------------------------------------------------------------------------
// Probe logs
// ---------------------------------------------------------------------------

/// Index key of trip probe groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OdPair {
    pub origin: i32,
    pub destination: i32,
}

/// Index key of edge probe groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EdgeKey {
    pub edge: i32,
}

/// Summary of one key's record group, stored at the front of probe blobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexEntry<K> {
    #[serde(flatten)]
    pub key: K,
    pub count: u32,
    pub time_min: f32,
    pub time_max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripProbe {
    pub vehicle: i32,
    pub origin: i32,
    pub destination: i32,
    pub class: i32,
    pub departure: f32,
    pub arrival: f32,
    pub distance: f32,
    pub stops: i32,
    pub fuel: f32,
}

/// Edge probe stored with plain floats (discriminant 11).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlainEdgeProbe {
    pub edge: i32,
    pub vehicle: i32,
    pub time: f32,
    pub travel_time: f32,
    pub speed: f32,
    pub delay: f32,
    pub fuel: f32,
}

/// Edge probe stored with fixed-point values (discriminant 21).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedEdgeProbe {
    pub edge: i32,
    pub vehicle: i32,
    pub time: f32,
    pub travel_time: f64,
    pub speed: f64,
    pub delay: f64,
    pub fuel: f64,
    pub stops: i32,
    pub lane: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum EdgeProbe {
    Plain(PlainEdgeProbe),
    Detailed(DetailedEdgeProbe),
}

impl EdgeProbe {
    pub const PLAIN: u8 = 11;
    pub const DETAILED: u8 = 21;

    pub fn discriminant(&self) -> u8 {
        match self {
            EdgeProbe::Plain(_) => Self::PLAIN,
            EdgeProbe::Detailed(_) => Self::DETAILED,
        }
    }

    pub fn edge(&self) -> i32 {
        match self {
            EdgeProbe::Plain(p) => p.edge,
            EdgeProbe::Detailed(p) => p.edge,
        }
    }

    pub fn time(&self) -> f32 {
        match self {
            EdgeProbe::Plain(p) => p.time,
            EdgeProbe::Detailed(p) => p.time,
        }
    }
}

/// One page of probe records selected by a key filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbePage<R> {
    /// Records in the index under the requested key, before time filtering.
    pub total_matching: u64,
    pub skip: usize,
    pub stride: usize,
    pub records: Vec<R>,
}

/// Result of a probe decode: the raw index when no key was requested,
/// otherwise a page of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeResult<K, R> {
    Index(Vec<IndexEntry<K>>),
    Page(ProbePage<R>),
}

pub type TripProbeResult = ProbeResult<OdPair, TripProbe>;
pub type EdgeProbeResult = ProbeResult<EdgeKey, EdgeProbe>;

/// Any decoded report, as handed back by the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportTree {
    Overview(Overview),
    AverageConditions(AverageConditions),
    Conditions(ConditionSlices),
    Paths(PathTrees),
    Summary(RunSummary),
    TripProbes(TripProbeResult),
    EdgeProbes(EdgeProbeResult),
    Nodes(NodeNetwork),
    Edges(EdgeNetwork),
    Signals(SignalPlan),
}
