//! Shared types: errors, report kinds, probe filters and record trees.

pub mod error;
pub mod file_kind;
pub mod filter;
pub mod models;
