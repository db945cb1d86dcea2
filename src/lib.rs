//! Offline Inventory - warehouse stock counting against a local snapshot
//!
//! Imports the on-hand inventory of one domain from the backend into SQLite,
//! then records physical counts scanned by an operator. Each count is matched
//! against the snapshot and classified before it is saved.

pub mod barcode;
pub mod database;
pub mod error;
pub mod import;
pub mod matching;
pub mod qad;
pub mod settings;
pub mod storage;
pub mod workflow;

// Re-export commonly used items
pub use barcode::{decode, DecodedScan, ScanMetadata, ScanMode};
pub use database::{
    append_scan_event, clear_all, clear_scan_events, find_snapshot_match, get_scan_event_count,
    get_snapshot_count, init_schema, list_scan_events, list_snapshot, open_db, replace_snapshot,
    start_fresh_session, NewScanEvent, NewSnapshotRecord, ScanEvent, SnapshotRecord,
};
pub use error::{Error, InventoryError, Result};
pub use import::{
    distinct_sites, fetch_and_import, fetch_domain_data, import_filtered, DomainData,
    ImportFilters, ImportSummary, SiteOption,
};
pub use matching::{lookup, MatchResult, MatchStatus};
pub use qad::{pick_default_domain, AuthoritativeRecord, Domain, QadClient};
pub use settings::{ScannerSettings, SettingsProvider};
pub use storage::{LocalStorage, SavedImportFilters, Session};
pub use workflow::{
    ScanWorkflow, SessionContext, Step, StepOutcome, Transition, WorkflowEvent, WorkflowState,
};
