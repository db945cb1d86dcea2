//! Barcode decoding for storage locations and items
//!
//! Pure functions, no database or network access.

use crate::error::{InventoryError, Result};
use crate::settings::ScannerSettings;

/// Separator between segments of a composite item label
const COMPOSITE_SEPARATOR: char = '#';

/// Marker of the reference segment inside a composite label
const REFERENCE_MARKER: &str = "R";

/// What the operator is expected to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Storage location (SM)
    Location,
    /// Item reference or part number
    Item,
}

/// Extra information extracted while decoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanMetadata {
    /// The full label when the scan was a `#`-separated composite
    pub full_composite: Option<String>,
    /// Composite label had no `R` segment; the first segment was used instead
    pub used_first_segment: bool,
}

/// Result of a successful decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedScan {
    /// Raw text as scanned
    pub original: String,
    /// Value after prefix/composite rules
    pub parsed: String,
    pub metadata: ScanMetadata,
}

impl DecodedScan {
    fn plain(original: &str, parsed: &str) -> Self {
        Self {
            original: original.to_string(),
            parsed: parsed.to_string(),
            metadata: ScanMetadata::default(),
        }
    }
}

/// Decode a raw scan according to the mode and the scanner settings
pub fn decode(raw: &str, mode: ScanMode, settings: &ScannerSettings) -> Result<DecodedScan> {
    if raw.is_empty() {
        return Err(InventoryError::Decode("empty scan".to_string()));
    }

    match mode {
        ScanMode::Location => decode_location(raw, &settings.sm_prefix),
        ScanMode::Item => Ok(decode_item(raw, &settings.item_prefix)),
    }
}

fn decode_location(raw: &str, prefix: &str) -> Result<DecodedScan> {
    if prefix.is_empty() {
        return Ok(DecodedScan::plain(raw, raw));
    }

    match raw.strip_prefix(prefix) {
        Some("") => Err(InventoryError::Decode(format!(
            "storage location missing after prefix \"{}\"",
            prefix
        ))),
        Some(rest) => Ok(DecodedScan::plain(raw, rest)),
        None => Err(InventoryError::Decode(format!(
            "wrong SM prefix, expected \"{}\"",
            prefix
        ))),
    }
}

fn decode_item(raw: &str, prefix: &str) -> DecodedScan {
    if raw.contains(COMPOSITE_SEPARATOR) {
        return decode_composite(raw);
    }

    // Unprefixed codes pass through unchanged so manual entry keeps working
    let parsed = if prefix.is_empty() {
        raw
    } else {
        raw.strip_prefix(prefix).unwrap_or(raw)
    };
    DecodedScan::plain(raw, parsed)
}

/// Composite labels look like `PF3G_1260_1000#SSO123478_999#RM0000078`
fn decode_composite(raw: &str) -> DecodedScan {
    let mut segments = raw.split(COMPOSITE_SEPARATOR);
    let first = segments.clone().next().unwrap_or(raw);

    match segments.find_map(|s| s.strip_prefix(REFERENCE_MARKER)) {
        Some(reference) => DecodedScan {
            original: raw.to_string(),
            parsed: reference.to_string(),
            metadata: ScanMetadata {
                full_composite: Some(raw.to_string()),
                used_first_segment: false,
            },
        },
        None => {
            log::debug!("Composite scan without reference segment: {}", raw);
            DecodedScan {
                original: raw.to_string(),
                parsed: first.to_string(),
                metadata: ScanMetadata {
                    full_composite: Some(raw.to_string()),
                    used_first_segment: true,
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "barcode_tests.rs"]
mod tests;
