//! Classifies a scanned item against the imported snapshot

use crate::database::{find_snapshot_match, SnapshotRecord};
use crate::error::{InventoryError, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::fmt;

/// How a scanned item relates to the snapshot at the scanned location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Found in the snapshot at the scanned location
    FoundOk,
    /// Found in the snapshot, but stored at another location
    FoundWrongSm,
    /// Not present in the snapshot
    NotFound,
    /// Snapshot lookup disabled in the settings
    Unknown,
}

impl MatchStatus {
    /// Value stored in the `status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::FoundOk => "FOUND_OK",
            MatchStatus::FoundWrongSm => "FOUND_WRONG_SM",
            MatchStatus::NotFound => "NOT_FOUND",
            MatchStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored `status` value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FOUND_OK" => Some(MatchStatus::FoundOk),
            "FOUND_WRONG_SM" => Some(MatchStatus::FoundWrongSm),
            "NOT_FOUND" => Some(MatchStatus::NotFound),
            "UNKNOWN" => Some(MatchStatus::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a snapshot lookup
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub record: Option<SnapshotRecord>,
    pub status: MatchStatus,
}

impl MatchResult {
    /// Classification used when the snapshot is not consulted
    pub fn unchecked() -> Self {
        Self {
            record: None,
            status: MatchStatus::Unknown,
        }
    }

    /// Operator-facing description of the match
    pub fn message(&self) -> String {
        match (&self.status, &self.record) {
            (MatchStatus::FoundOk, Some(r)) => {
                format!("Found: {} ({} pcs)", r.part_number, r.quantity)
            }
            (MatchStatus::FoundWrongSm, Some(r)) => {
                format!("WARNING: found at a different location: {}!", r.storage_location)
            }
            (MatchStatus::Unknown, _) => "Not checked against imported data.".to_string(),
            _ => "Not found in imported data.".to_string(),
        }
    }
}

/// Classify a decoded reference relative to the scanned location
pub fn classify(record: Option<SnapshotRecord>, current_location: &str) -> MatchResult {
    let status = match &record {
        None => MatchStatus::NotFound,
        Some(r) if r.storage_location == current_location => MatchStatus::FoundOk,
        Some(_) => MatchStatus::FoundWrongSm,
    };
    MatchResult { record, status }
}

/// Look a decoded reference up in the snapshot and classify it
///
/// Read-only. Storage failures are reported as [`InventoryError::Lookup`].
pub fn lookup(conn: &Connection, decoded_ref: &str, current_location: &str) -> Result<MatchResult> {
    if decoded_ref.is_empty() {
        // Imported rows default missing references to "", never match on that
        return Ok(classify(None, current_location));
    }

    let record = find_snapshot_match(conn, decoded_ref).map_err(InventoryError::Lookup)?;
    let result = classify(record, current_location);
    log::debug!(
        "Lookup {} at {}: {}",
        decoded_ref,
        current_location,
        result.status
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{init_schema, replace_snapshot, NewSnapshotRecord};

    fn test_db(rows: &[(&str, &str, &str)]) -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let records: Vec<NewSnapshotRecord> = rows
            .iter()
            .map(|(reference, part, location)| NewSnapshotRecord {
                domain: "CZ01".to_string(),
                part_number: part.to_string(),
                storage_location: location.to_string(),
                reference: reference.to_string(),
                quantity: "4".to_string(),
                ..NewSnapshotRecord::default()
            })
            .collect();
        replace_snapshot(&mut conn, &records).unwrap();
        conn
    }

    #[test]
    fn found_at_scanned_location() {
        let conn = test_db(&[("555", "P-1", "A1")]);
        let result = lookup(&conn, "555", "A1").unwrap();
        assert_eq!(result.status, MatchStatus::FoundOk);
        assert_eq!(result.record.unwrap().part_number, "P-1");
    }

    #[test]
    fn found_at_other_location() {
        let conn = test_db(&[("555", "P-1", "A1")]);
        let result = lookup(&conn, "555", "A2").unwrap();
        assert_eq!(result.status, MatchStatus::FoundWrongSm);
        assert!(result.message().contains("A1"));
    }

    #[test]
    fn matches_on_part_number() {
        let conn = test_db(&[("555", "P-1", "A1")]);
        let result = lookup(&conn, "P-1", "A1").unwrap();
        assert_eq!(result.status, MatchStatus::FoundOk);
    }

    #[test]
    fn not_found() {
        let conn = test_db(&[("555", "P-1", "A1")]);
        let result = lookup(&conn, "999", "A1").unwrap();
        assert_eq!(result.status, MatchStatus::NotFound);
        assert!(result.record.is_none());
    }

    #[test]
    fn empty_reference_never_matches_blank_rows() {
        let conn = test_db(&[("", "", "A1")]);
        let result = lookup(&conn, "", "A1").unwrap();
        assert_eq!(result.status, MatchStatus::NotFound);
    }

    #[test]
    fn storage_failure_is_a_lookup_error() {
        // No schema: the query itself fails
        let conn = Connection::open_in_memory().unwrap();
        let err = lookup(&conn, "555", "A1").unwrap_err();
        assert!(matches!(err, InventoryError::Lookup(_)));
    }

    #[test]
    fn status_round_trips_through_column_value() {
        for status in [
            MatchStatus::FoundOk,
            MatchStatus::FoundWrongSm,
            MatchStatus::NotFound,
            MatchStatus::Unknown,
        ] {
            assert_eq!(MatchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MatchStatus::parse("MATCH_OK"), None);
    }
}
