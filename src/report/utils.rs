//! Helpers for getting report files into line form.
//!
//! Reports are written by the simulator in whatever code page the host was
//! set to, so the raw bytes go through `encoding_rs` before line splitting.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use log::{info, warn};

use super::types::error::Result;

/// Resolves a WHATWG encoding label, falling back to UTF-8.
pub fn encoding_for_label(label: Option<&str>) -> &'static Encoding {
    match label {
        None => UTF_8,
        Some(label) => Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
            warn!("Unknown encoding label {:?}, using UTF-8", label);
            UTF_8
        }),
    }
}

/// Decodes raw report bytes into text.
///
/// A byte-order mark overrides `label`. Malformed sequences are replaced
/// rather than rejected; the codec reports them later as bad tokens.
pub fn decode_report_text(bytes: &[u8], label: Option<&str>) -> String {
    let encoding = encoding_for_label(label);
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!("Report text had invalid {} sequences", used.name());
    }
    text.into_owned()
}

/// Splits report text into lines with `\n` or `\r\n` endings removed.
pub fn report_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Reads and decodes a report file.
///
/// # Arguments
/// * `path` - Report file on disk
/// * `label` - Optional encoding label such as `windows-1252`
///
/// # Errors
/// Returns `Io` if the file cannot be read.
pub fn read_report_file(path: impl AsRef<Path>, label: Option<&str>) -> Result<String> {
    let path = path.as_ref();
    info!("Reading report file: {}", path.display());
    let bytes = std::fs::read(path)?;
    Ok(decode_report_text(&bytes, label))
}
