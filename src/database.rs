//! Local SQLite store for the inventory snapshot and committed scan events
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Multi-row writes run inside a single transaction: a snapshot replace either
//! lands completely or leaves the previous snapshot untouched.

use crate::matching::MatchStatus;
use rusqlite::{params, Connection, Row, Transaction};
use serde::Serialize;
use std::path::Path;

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// One authoritative inventory line, as stored in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRecord {
    pub id: i64,
    pub domain: String,
    pub part_number: String,
    pub site: String,
    pub storage_location: String,
    pub batch: String,
    pub reference: String,
    /// Quantity on hand, kept as the text the backend sent
    pub quantity: String,
    pub created_at: String,
}

/// Snapshot line ready to be inserted by an import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSnapshotRecord {
    pub domain: String,
    pub part_number: String,
    pub site: String,
    pub storage_location: String,
    pub batch: String,
    pub reference: String,
    pub quantity: String,
}

/// A committed count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEvent {
    pub id: i64,
    pub domain: String,
    pub site: String,
    pub storage_location: String,
    pub original_location_scan: String,
    pub part_number: String,
    pub batch: String,
    pub reference: String,
    pub original_reference_scan: String,
    pub quantity: f64,
    pub scan_date: String,
    pub scanned_by: String,
    pub is_manual_qty: bool,
    pub status: MatchStatus,
}

/// Scan event ready to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct NewScanEvent {
    pub domain: String,
    pub site: String,
    pub storage_location: String,
    pub original_location_scan: String,
    pub part_number: String,
    pub batch: String,
    pub reference: String,
    pub original_reference_scan: String,
    pub quantity: f64,
    pub scan_date: String,
    pub scanned_by: String,
    pub is_manual_qty: bool,
    pub status: MatchStatus,
}

/// Open (or create) the database file and make sure the schema exists
pub fn open_db(path: &Path) -> DbResult<Connection> {
    let conn = Connection::open(path)?;
    log::info!("Opened database: {}", path.display());
    init_schema(&conn)?;
    Ok(conn)
}

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `snapshot_records`: authoritative inventory imported from the backend
/// - `scan_events`: counts committed by the operator (append-only)
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS snapshot_records (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            domain           TEXT NOT NULL DEFAULT '',
            part_number      TEXT NOT NULL DEFAULT '',
            site             TEXT NOT NULL DEFAULT '',
            storage_location TEXT NOT NULL DEFAULT '',
            batch            TEXT NOT NULL DEFAULT '',
            reference        TEXT NOT NULL DEFAULT '',
            quantity         TEXT NOT NULL DEFAULT '0',
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_snapshot_reference ON snapshot_records(reference);
        CREATE INDEX IF NOT EXISTS idx_snapshot_part ON snapshot_records(part_number);

        CREATE TABLE IF NOT EXISTS scan_events (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            domain                  TEXT NOT NULL,
            site                    TEXT NOT NULL,
            storage_location        TEXT NOT NULL CHECK (storage_location <> ''),
            original_location_scan  TEXT NOT NULL,
            part_number             TEXT NOT NULL,
            batch                   TEXT NOT NULL DEFAULT '',
            reference               TEXT NOT NULL,
            original_reference_scan TEXT NOT NULL,
            quantity                REAL NOT NULL,
            scan_date               TEXT NOT NULL,
            scanned_by              TEXT NOT NULL,
            is_manual_qty           INTEGER NOT NULL DEFAULT 0,
            status                  TEXT NOT NULL
                CHECK (status IN ('FOUND_OK', 'FOUND_WRONG_SM', 'NOT_FOUND', 'UNKNOWN'))
        );
        ",
    )?;

    log::debug!("Database schema initialized");
    Ok(())
}

/// Drop the snapshot and all scan events and recreate empty tables.
///
/// Every counting session starts from a clean store.
pub fn start_fresh_session(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS snapshot_records;
        DROP TABLE IF EXISTS scan_events;
        ",
    )?;
    init_schema(conn)?;
    log::info!("Started fresh session: snapshot and scan events dropped");
    Ok(())
}

// ── Snapshot ───────────────────────────────────────────────────────────────

/// Replace the whole snapshot with `records`
///
/// Delete and insert share one transaction; on any error the transaction is
/// rolled back when dropped and the previous snapshot stays visible.
pub fn replace_snapshot(conn: &mut Connection, records: &[NewSnapshotRecord]) -> DbResult<usize> {
    let tx = conn.transaction()?;
    let count = replace_snapshot_tx(&tx, records)?;
    tx.commit()?;
    Ok(count)
}

fn replace_snapshot_tx(tx: &Transaction<'_>, records: &[NewSnapshotRecord]) -> DbResult<usize> {
    let removed = tx.execute("DELETE FROM snapshot_records", [])?;
    log::debug!("Removed {} previous snapshot rows", removed);

    let mut stmt = tx.prepare_cached(
        "INSERT INTO snapshot_records
         (domain, part_number, site, storage_location, batch, reference, quantity)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    let mut count = 0;
    for record in records {
        stmt.execute(params![
            &record.domain,
            &record.part_number,
            &record.site,
            &record.storage_location,
            &record.batch,
            &record.reference,
            &record.quantity,
        ])?;
        count += 1;
    }

    log::info!("Inserted {} snapshot records", count);
    Ok(count)
}

const SNAPSHOT_COLUMNS: &str =
    "id, domain, part_number, site, storage_location, batch, reference, quantity, created_at";

fn snapshot_from_row(row: &Row<'_>) -> DbResult<SnapshotRecord> {
    Ok(SnapshotRecord {
        id: row.get(0)?,
        domain: row.get(1)?,
        part_number: row.get(2)?,
        site: row.get(3)?,
        storage_location: row.get(4)?,
        batch: row.get(5)?,
        reference: row.get(6)?,
        quantity: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Find the snapshot record for a scanned code
///
/// Matches on `reference` or `part_number`. Reference matches win over part
/// number matches; among those the first imported row wins.
pub fn find_snapshot_match(conn: &Connection, code: &str) -> DbResult<Option<SnapshotRecord>> {
    let sql = format!(
        "SELECT {SNAPSHOT_COLUMNS}
         FROM snapshot_records
         WHERE reference = ?1 OR part_number = ?1
         ORDER BY CASE WHEN reference = ?1 THEN 0 ELSE 1 END, id
         LIMIT 1"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut rows = stmt.query(params![code])?;
    match rows.next()? {
        Some(row) => Ok(Some(snapshot_from_row(row)?)),
        None => Ok(None),
    }
}

/// All snapshot records in import order
pub fn list_snapshot(conn: &Connection) -> DbResult<Vec<SnapshotRecord>> {
    let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshot_records ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let results: DbResult<Vec<SnapshotRecord>> = stmt.query_map([], snapshot_from_row)?.collect();
    results
}

/// Get total count of snapshot records
pub fn get_snapshot_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM snapshot_records", [], |row| row.get(0))
}

// ── Scan events ────────────────────────────────────────────────────────────

/// Append one committed count. Returns the new row id.
pub fn append_scan_event(conn: &Connection, event: &NewScanEvent) -> DbResult<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO scan_events
         (domain, site, storage_location, original_location_scan, part_number, batch,
          reference, original_reference_scan, quantity, scan_date, scanned_by,
          is_manual_qty, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )?;
    stmt.execute(params![
        &event.domain,
        &event.site,
        &event.storage_location,
        &event.original_location_scan,
        &event.part_number,
        &event.batch,
        &event.reference,
        &event.original_reference_scan,
        event.quantity,
        &event.scan_date,
        &event.scanned_by,
        event.is_manual_qty,
        event.status.as_str(),
    ])?;
    let id = conn.last_insert_rowid();
    log::debug!(
        "Scan event {} saved: {} x{} at {} ({})",
        id,
        event.reference,
        event.quantity,
        event.storage_location,
        event.status
    );
    Ok(id)
}

/// All scan events, newest first
pub fn list_scan_events(conn: &Connection) -> DbResult<Vec<ScanEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, domain, site, storage_location, original_location_scan, part_number,
                batch, reference, original_reference_scan, quantity, scan_date,
                scanned_by, is_manual_qty, status
         FROM scan_events
         ORDER BY scan_date DESC, id DESC",
    )?;

    let results: DbResult<Vec<ScanEvent>> = stmt
        .query_map([], |row| {
            let status: String = row.get(13)?;
            Ok(ScanEvent {
                id: row.get(0)?,
                domain: row.get(1)?,
                site: row.get(2)?,
                storage_location: row.get(3)?,
                original_location_scan: row.get(4)?,
                part_number: row.get(5)?,
                batch: row.get(6)?,
                reference: row.get(7)?,
                original_reference_scan: row.get(8)?,
                quantity: row.get(9)?,
                scan_date: row.get(10)?,
                scanned_by: row.get(11)?,
                is_manual_qty: row.get(12)?,
                status: MatchStatus::parse(&status).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        13,
                        rusqlite::types::Type::Text,
                        format!("unknown match status: {}", status).into(),
                    )
                })?,
            })
        })?
        .collect();
    results
}

/// Get total count of scan events
pub fn get_scan_event_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM scan_events", [], |row| row.get(0))
}

/// Remove every scan event (explicit reset). Returns the number removed.
pub fn clear_scan_events(conn: &Connection) -> DbResult<usize> {
    let removed = conn.execute("DELETE FROM scan_events", [])?;
    log::info!("Cleared {} scan events", removed);
    Ok(removed)
}

/// Empty both the snapshot and the scan log in one transaction
pub fn clear_all(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM snapshot_records", [])?;
    tx.execute("DELETE FROM scan_events", [])?;
    tx.commit()?;
    log::info!("Database cleared");
    Ok(())
}
