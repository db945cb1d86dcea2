//! Small JSON files kept next to the database
//!
//! - `settings.json`: scanner settings
//! - `session.json`: access token, operator id and selected domain
//! - `import_filters.json`: filters of the last successful import

use crate::error::Result;
use crate::import::ImportFilters;
use crate::settings::{ScannerSettings, SettingsProvider};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";
const SESSION_FILE: &str = "session.json";
const IMPORT_FILTERS_FILE: &str = "import_filters.json";

/// Operator session persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    pub domain: Option<String>,
}

/// Import filters remembered together with the domain they were used for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedImportFilters {
    pub domain: String,
    #[serde(flatten)]
    pub filters: ImportFilters,
}

/// File-backed storage rooted at one directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: ~/.local/share/offline_inventory
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offline_inventory")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Option<T> {
        let path = self.dir.join(file);
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!("Failed to parse {}, ignoring it: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file);
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, content)?;
        log::debug!("Saved {}", path.display());
        Ok(())
    }

    pub fn load_session(&self) -> Session {
        self.read_json(SESSION_FILE).unwrap_or_default()
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        self.write_json(SESSION_FILE, session)
    }

    /// Forget token, operator and domain
    pub fn clear_auth(&self) -> Result<()> {
        self.save_session(&Session::default())
    }

    pub fn load_import_filters(&self) -> Option<SavedImportFilters> {
        self.read_json(IMPORT_FILTERS_FILE)
    }

    pub fn save_import_filters(&self, saved: &SavedImportFilters) -> Result<()> {
        self.write_json(IMPORT_FILTERS_FILE, saved)
    }
}

impl SettingsProvider for LocalStorage {
    fn load_settings(&self) -> ScannerSettings {
        let path = self.dir.join(SETTINGS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => ScannerSettings::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ScannerSettings::default(),
            Err(e) => {
                log::warn!("Failed to read {}, using defaults: {}", path.display(), e);
                ScannerSettings::default()
            }
        }
    }

    fn save_settings(&self, settings: &ScannerSettings) -> Result<()> {
        self.write_json(SETTINGS_FILE, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested"));
        (dir, storage)
    }

    #[test]
    fn missing_settings_file_gives_defaults() {
        let (_dir, storage) = storage();
        assert_eq!(storage.load_settings(), ScannerSettings::default());
    }

    #[test]
    fn settings_round_trip_creates_directory() {
        let (_dir, storage) = storage();
        let settings = ScannerSettings {
            sm_prefix: "L".to_string(),
            check_against_db: false,
            ..ScannerSettings::default()
        };
        storage.save_settings(&settings).unwrap();
        assert_eq!(storage.load_settings(), settings);
    }

    #[test]
    fn partial_settings_file_is_merged() {
        let (_dir, storage) = storage();
        std::fs::create_dir_all(storage.dir()).unwrap();
        std::fs::write(storage.dir().join(SETTINGS_FILE), r#"{"itemPrefix": "REF"}"#).unwrap();

        let settings = storage.load_settings();
        assert_eq!(settings.item_prefix, "REF");
        assert!(settings.check_against_db);
    }

    #[test]
    fn malformed_settings_file_gives_defaults() {
        let (_dir, storage) = storage();
        std::fs::create_dir_all(storage.dir()).unwrap();
        std::fs::write(storage.dir().join(SETTINGS_FILE), "{{{").unwrap();
        assert_eq!(storage.load_settings(), ScannerSettings::default());
    }

    #[test]
    fn session_round_trip_and_clear() {
        let (_dir, storage) = storage();
        assert_eq!(storage.load_session(), Session::default());

        let session = Session {
            access_token: Some("tok".to_string()),
            user_id: Some("jnovak".to_string()),
            domain: Some("CZ01".to_string()),
        };
        storage.save_session(&session).unwrap();
        assert_eq!(storage.load_session(), session);

        storage.clear_auth().unwrap();
        assert_eq!(storage.load_session(), Session::default());
    }

    #[test]
    fn import_filters_round_trip() {
        let (_dir, storage) = storage();
        assert!(storage.load_import_filters().is_none());

        let saved = SavedImportFilters {
            domain: "CZ01".to_string(),
            filters: ImportFilters {
                site: "1000".to_string(),
                storage_location: "A1*".to_string(),
                part: "*".to_string(),
            },
        };
        storage.save_import_filters(&saved).unwrap();
        assert_eq!(storage.load_import_filters(), Some(saved));
    }
}
