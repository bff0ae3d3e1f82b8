//! Core report codec module.
//!
//! # Architecture
//!
//! ```text
//! ReportRegistry ─▶ format::{Overview, Nodes, …}   (ReportFormat impls)
//!                        │
//!                        ├─▶ sections   (forward-only line walking)
//!                        └─▶ codec::{line_format, scanner, cursor}
//! ```

pub mod codec;
pub mod format;
pub mod registry;
pub mod types;
pub mod utils;

pub use registry::{ArtifactIndex, CodecContext, ReportRegistry};
pub use types::error::{Location, ReportError, Result};
pub use types::file_kind::FileKind;
pub use types::filter::{ProbeFilter, ProbeKey};
