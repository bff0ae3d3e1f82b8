//! Entry point used by collaborators: kind-dispatched encode and decode.

use log::{debug, info};

use super::format::conditions::{AverageConditions, Conditions};
use super::format::network::{Edges, Nodes, Signals};
use super::format::overview::Overview;
use super::format::paths::Paths;
use super::format::probes::{self, edges::EdgeLayout, trips::TripLayout};
use super::format::summary::Summary;
use super::format::{decode, encode};
use super::types::error::Result;
use super::types::file_kind::FileKind;
use super::types::filter::ProbeFilter;
use super::types::models::ReportTree;

/// Caller identifiers for one codec call.
///
/// Only used for the existence check and for log lines; parsing never
/// depends on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecContext {
    pub simulation_id: u64,
    pub owner_id: u64,
}

/// Answers whether an artifact is already stored.
pub trait ArtifactIndex {
    fn contains(&self, ctx: &CodecContext, kind: FileKind) -> bool;
}

impl<F> ArtifactIndex for F
where
    F: Fn(&CodecContext, FileKind) -> bool,
{
    fn contains(&self, ctx: &CodecContext, kind: FileKind) -> bool {
        self(ctx, kind)
    }
}

/// Maps a [`FileKind`] to its encoder and decoder.
pub struct ReportRegistry<A> {
    artifacts: A,
}

impl<A: ArtifactIndex> ReportRegistry<A> {
    pub fn new(artifacts: A) -> Self {
        Self { artifacts }
    }

    /// Encodes report lines into a blob.
    ///
    /// Returns `Ok(None)` without parsing anything when the artifact for
    /// (`ctx.simulation_id`, `kind`) is already stored. Trailing `\r`/`\n`
    /// are stripped from every line; nothing else is trimmed.
    ///
    /// # Errors
    /// Any detection, parse or cursor error; no partial blob is returned.
    pub fn encode<S: AsRef<str>>(&self, kind: FileKind, lines: &[S], ctx: &CodecContext) -> Result<Option<Vec<u8>>> {
        if self.artifacts.contains(ctx, kind) {
            info!(
                "Simulation {}: {} already stored, nothing to encode",
                ctx.simulation_id, kind
            );
            return Ok(None);
        }

        info!(
            "Simulation {} (owner {}): encoding {} report",
            ctx.simulation_id, ctx.owner_id, kind
        );
        let lines: Vec<&str> = lines
            .iter()
            .map(|line| line.as_ref().trim_end_matches(['\r', '\n']))
            .collect();

        let blob = match kind {
            FileKind::Overview => encode::<Overview>(&lines)?,
            FileKind::AverageConditions => encode::<AverageConditions>(&lines)?,
            FileKind::Conditions => encode::<Conditions>(&lines)?,
            FileKind::Paths => encode::<Paths>(&lines)?,
            FileKind::Summary => encode::<Summary>(&lines)?,
            FileKind::TripProbes => encode::<probes::TripProbes>(&lines)?,
            FileKind::EdgeProbes => encode::<probes::EdgeProbes>(&lines)?,
            FileKind::Nodes => encode::<Nodes>(&lines)?,
            FileKind::Edges => encode::<Edges>(&lines)?,
            FileKind::Signals => encode::<Signals>(&lines)?,
        };
        Ok(Some(blob))
    }

    /// Decodes a blob into its record tree.
    ///
    /// `filter` only applies to the probe kinds; without one they return
    /// their index.
    ///
    /// # Errors
    /// `OutOfBounds` for truncated blobs, `MalformedReport` for blobs of the
    /// wrong shape, `InvalidFilter` for unusable probe filters and
    /// `UnknownRecordType` for edge probe records of an unknown type.
    pub fn decode(
        &self,
        kind: FileKind,
        blob: &[u8],
        filter: Option<&ProbeFilter>,
        ctx: &CodecContext,
    ) -> Result<ReportTree> {
        info!(
            "Simulation {} (owner {}): decoding {} blob",
            ctx.simulation_id, ctx.owner_id, kind
        );
        if filter.is_some() && !kind.is_indexed() {
            debug!("{}: filter ignored for a plain report kind", kind);
        }
        let filter = filter.copied().unwrap_or_default();

        Ok(match kind {
            FileKind::Overview => ReportTree::Overview(decode::<Overview>(blob)?),
            FileKind::AverageConditions => ReportTree::AverageConditions(decode::<AverageConditions>(blob)?),
            FileKind::Conditions => ReportTree::Conditions(decode::<Conditions>(blob)?),
            FileKind::Paths => ReportTree::Paths(decode::<Paths>(blob)?),
            FileKind::Summary => ReportTree::Summary(decode::<Summary>(blob)?),
            FileKind::TripProbes => ReportTree::TripProbes(probes::decode::<TripLayout>(blob, &filter)?),
            FileKind::EdgeProbes => ReportTree::EdgeProbes(probes::decode::<EdgeLayout>(blob, &filter)?),
            FileKind::Nodes => ReportTree::Nodes(decode::<Nodes>(blob)?),
            FileKind::Edges => ReportTree::Edges(decode::<Edges>(blob)?),
            FileKind::Signals => ReportTree::Signals(decode::<Signals>(blob)?),
        })
    }
}
