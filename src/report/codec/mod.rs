//! Low-level codec primitives shared by every report kind.
//!
//! - [`cursor`]: bounds-checked little-endian reads and writes
//! - [`line_format`]: positional field layouts built from descriptors
//! - [`scanner`]: splitting lines into fields and parsing field tokens

pub mod cursor;
pub mod line_format;
pub mod scanner;
