//! Error types for offline_inventory

use thiserror::Error;

/// Unified error type for scanning, import and storage operations
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Scanned text could not be decoded (empty scan, wrong prefix)
    #[error("Decode error: {0}")]
    Decode(String),
    /// Operator input rejected (bad quantity, event not valid in this step)
    #[error("Validation error: {0}")]
    Validation(String),
    /// Snapshot lookup failed while matching a scanned item
    #[error("Lookup failed: {0}")]
    Lookup(#[source] rusqlite::Error),
    /// Import aborted; the previous snapshot is still in place
    #[error("Import failed: {0}")]
    Import(String),
    /// Configuration could not be read or written
    #[error("Configuration error: {0}")]
    Config(String),
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP error status code
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Failed to parse JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Backend rejected the credentials
    #[error("Authentication failed")]
    Auth,
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InventoryError {
    /// Operator-recoverable errors keep the workflow in its current step
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            InventoryError::Decode(_) | InventoryError::Validation(_)
        )
    }
}

/// Short alias used across the crate
pub type Error = InventoryError;

/// Result alias for offline_inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;
