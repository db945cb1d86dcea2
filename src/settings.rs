//! Scanner settings
//!
//! Every option is enumerated here with its default. Persisted JSON may contain
//! only some of the keys; missing keys take the defaults below.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Scanner behaviour configured by the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerSettings {
    /// Required prefix on storage location barcodes (empty = no check)
    pub sm_prefix: String,
    /// Prefix stripped from item barcodes when present
    pub item_prefix: String,
    /// Look scanned items up in the imported snapshot
    pub check_against_db: bool,
    /// Ask for a new storage location after every committed item
    pub reset_sm_after_item: bool,
    /// Operator types the quantity; otherwise it defaults to 1
    pub manual_qty: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            sm_prefix: String::new(),
            item_prefix: "R".to_string(),
            check_against_db: true,
            reset_sm_after_item: false,
            manual_qty: true,
        }
    }
}

impl ScannerSettings {
    /// Parse persisted settings, merging them over the defaults.
    ///
    /// Malformed JSON is logged and replaced by the defaults.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Malformed scanner settings, using defaults: {}", e);
                Self::default()
            }
        }
    }
}

/// Source of scanner settings for a scan session
pub trait SettingsProvider {
    /// Load settings merged with defaults. Never fails.
    fn load_settings(&self) -> ScannerSettings;

    /// Persist settings
    fn save_settings(&self, settings: &ScannerSettings) -> Result<()>;
}
