//! Query options for the indexed probe decoders.

use serde::Deserialize;

use super::error::{ReportError, Result};

/// Key a probe query is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKey {
    OriginDestination { origin: i32, destination: i32 },
    Edge { edge: i32 },
}

/// Filter, pagination and stride options for probe decoding.
///
/// Deserialises from JSON with every field optional. The key is given as
/// `origin` and `destination` together, or `edge` alone; any other mix of
/// key fields, an unknown field or a non-integer key is rejected.
///
/// ```
/// # use simreport::ProbeFilter;
/// let filter = ProbeFilter::from_json(r#"{"edge": 7, "max": 20}"#).unwrap();
/// assert_eq!(filter.max, 20);
/// assert_eq!(filter.stride, 1);
/// assert!(ProbeFilter::from_json(r#"{"origin": 7}"#).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "FilterFields")]
pub struct ProbeFilter {
    /// Absent means "return the index instead of records".
    pub match_key: Option<ProbeKey>,
    pub skip: usize,
    pub max: usize,
    pub stride: usize,
    /// Inclusive lower time bound.
    pub time0: f32,
    /// Exclusive upper time bound.
    pub time1: f32,
}

impl Default for ProbeFilter {
    fn default() -> Self {
        Self {
            match_key: None,
            skip: 0,
            max: 500,
            stride: 1,
            time0: 0.0,
            time1: f32::INFINITY,
        }
    }
}

/// Wire shape of [`ProbeFilter`], with the key spread over loose fields.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FilterFields {
    origin: Option<i32>,
    destination: Option<i32>,
    edge: Option<i32>,
    skip: usize,
    max: usize,
    stride: usize,
    time0: f32,
    time1: f32,
}

impl Default for FilterFields {
    fn default() -> Self {
        let defaults = ProbeFilter::default();
        Self {
            origin: None,
            destination: None,
            edge: None,
            skip: defaults.skip,
            max: defaults.max,
            stride: defaults.stride,
            time0: defaults.time0,
            time1: defaults.time1,
        }
    }
}

impl TryFrom<FilterFields> for ProbeFilter {
    type Error = ReportError;

    fn try_from(fields: FilterFields) -> Result<Self> {
        let match_key = match (fields.origin, fields.destination, fields.edge) {
            (None, None, None) => None,
            (Some(origin), Some(destination), None) => Some(ProbeKey::OriginDestination { origin, destination }),
            (None, None, Some(edge)) => Some(ProbeKey::Edge { edge }),
            (origin, destination, edge) => {
                return Err(ReportError::InvalidFilter(format!(
                    "key takes origin with destination, or edge alone (origin {:?}, destination {:?}, edge {:?})",
                    origin, destination, edge
                )));
            }
        };
        Ok(Self {
            match_key,
            skip: fields.skip,
            max: fields.max,
            stride: fields.stride,
            time0: fields.time0,
            time1: fields.time1,
        })
    }
}

impl ProbeFilter {
    pub fn for_key(key: ProbeKey) -> Self {
        Self {
            match_key: Some(key),
            ..Self::default()
        }
    }

    /// Parses a filter from JSON.
    ///
    /// # Errors
    /// Returns `InvalidFilter` for malformed JSON, unknown fields, values of
    /// the wrong type and partial or mixed keys.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReportError::InvalidFilter(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max == 0 {
            return Err(ReportError::InvalidFilter("max must be at least 1".to_string()));
        }
        if self.stride == 0 {
            return Err(ReportError::InvalidFilter("stride must be at least 1".to_string()));
        }
        if self.time0.is_nan() || self.time1.is_nan() {
            return Err(ReportError::InvalidFilter("time bounds must be numbers".to_string()));
        }
        if self.time1 < self.time0 {
            return Err(ReportError::InvalidFilter(format!(
                "time1 ({}) is before time0 ({})",
                self.time1, self.time0
            )));
        }
        Ok(())
    }

    /// True when `time` falls inside `[time0, time1)`.
    pub fn in_window(&self, time: f32) -> bool {
        time >= self.time0 && time < self.time1
    }

    /// Whether an index group spanning `[time_min, time_max]` can hold a
    /// record inside the time window.
    pub fn overlaps(&self, time_min: f32, time_max: f32) -> bool {
        time_max >= self.time0 && time_min < self.time1
    }

    /// Number of records a page will hold for `total_matching` candidates.
    ///
    /// Rounds up, so three matches with stride 2 yield match positions 0 and 2.
    pub fn result_size(&self, total_matching: u64) -> usize {
        let skip = self.skip as u64;
        if total_matching <= skip {
            return 0;
        }
        let stride = self.stride.max(1) as u64;
        let strided = (total_matching - skip).div_ceil(stride);
        strided.min(self.max as u64) as usize
    }
}
