//! Field delimiter detection for delimited text.
//!
//! The candidate set is closed: `,` `;` tab `|` (see [`CANDIDATE_DELIMITERS`]). Any other
//! separator, such as `:` or a space, is a [`DetectionError`]; the CSV loader then reads the file
//! with [`DEFAULT_DELIMITER`], which usually yields a single column.
//!
//! Only one sample line is inspected (the first line of the file). Characters inside
//! double-quoted sections are not counted, so `"Smith, John";42` sniffs as `;`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

/// Candidate delimiters in tie-break preference order.
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Delimiter used when sniffing fails.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Sniffing found no usable delimiter in the sample line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not determine delimiter: {reason}")]
pub struct DetectionError {
    /// Why the sample was rejected.
    pub reason: String,
}

impl DetectionError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Infer the field delimiter of a delimited-text sample line.
///
/// Counts each candidate outside quoted sections; the most frequent wins and ties go to the
/// earlier entry of [`CANDIDATE_DELIMITERS`].
///
/// ```
/// use tabular_uploader::ingestion::sniff::detect_separator;
///
/// assert_eq!(detect_separator("id;name;city").unwrap(), b';');
/// assert!(detect_separator("just_one_column").is_err());
/// ```
pub fn detect_separator(line: &str) -> Result<u8, DetectionError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(DetectionError::new("sample line is empty"));
    }

    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for b in line.bytes() {
        if b == b'"' {
            // A doubled quote inside a quoted field toggles twice and nets out.
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(idx) = CANDIDATE_DELIMITERS.iter().position(|&d| d == b) {
            counts[idx] += 1;
        }
    }

    if in_quotes {
        return Err(DetectionError::new("sample line has an unterminated quote"));
    }

    let mut best: Option<(usize, usize)> = None;
    for (idx, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((idx, count)),
        }
    }

    best.map(|(idx, _)| CANDIDATE_DELIMITERS[idx])
        .ok_or_else(|| DetectionError::new("no candidate delimiter found in sample line"))
}

/// Read the first line of `path` and sniff its delimiter.
///
/// I/O failures (including a first line that is not valid UTF-8) are returned as
/// [`std::io::Error`]; an unusable sample is a [`DetectionError`] nested inside `Ok`.
pub fn detect_separator_from_path(
    path: impl AsRef<Path>,
) -> std::io::Result<Result<u8, DetectionError>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let line = line.strip_prefix('\u{feff}').unwrap_or(&line);
    Ok(detect_separator(line))
}
