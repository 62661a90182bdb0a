//! Persisted catalog preferences: the cached app list and the selected app.
//!
//! The catalog treats this store as the single source of truth for its app
//! list: a remote refresh writes here first and then reloads from here. Read
//! and write failures are internal to the store (logged, never surfaced), so
//! a corrupt or missing file degrades to "no cached data".

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::NO_SELECTED_APP;
use crate::models::AppRecord;

/// Increment whenever `StoredPrefs` or `AppRecord` changes shape in a way
/// that would make old files unreadable. Old files are silently discarded.
pub const PREFS_SCHEMA_VERSION: u32 = 1;

/// Key-value preference mirror consumed by the catalog.
pub trait PreferenceStore: Send + Sync {
    fn selected_app_id(&self) -> String;
    fn set_selected_app_id(&self, id: &str);
    fn app_list(&self) -> Vec<AppRecord>;
    fn set_app_list(&self, apps: &[AppRecord]);
    fn set_app_enabled(&self, app_id: &str, enabled: bool);
}

/// Versioned binary envelope wrapping the persisted payload.
#[derive(Serialize, Deserialize)]
struct PrefsEnvelope {
    schema_version: u32,
    /// Unix seconds when this file was written.
    saved_at: u64,
    prefs: StoredPrefs,
}

#[derive(Serialize, Deserialize, Clone)]
struct StoredPrefs {
    selected_app_id: String,
    apps: Vec<AppRecord>,
}

impl Default for StoredPrefs {
    fn default() -> Self {
        Self {
            selected_app_id: NO_SELECTED_APP.to_string(),
            apps: Vec::new(),
        }
    }
}

fn prefs_path(data_dir: &Path) -> PathBuf {
    data_dir.join("catalog_prefs.bin")
}

/// Disk-backed store. Loads once at construction, rewrites the whole file on
/// every mutation using a write-to-temp-then-rename pattern so a shutdown
/// mid-write never leaves a half-written file behind.
pub struct DiskPreferenceStore {
    path: PathBuf,
    prefs: Mutex<StoredPrefs>,
}

impl DiskPreferenceStore {
    pub fn new(data_dir: &Path) -> Self {
        let path = prefs_path(data_dir);
        let prefs = Self::load(&path).unwrap_or_default();
        Self {
            path,
            prefs: Mutex::new(prefs),
        }
    }

    /// Returns `None` on any failure: file missing, corrupt data, or a
    /// schema version mismatch.
    fn load(path: &Path) -> Option<StoredPrefs> {
        let bytes = std::fs::read(path).ok()?;
        let envelope: PrefsEnvelope = bincode::deserialize(&bytes).ok()?;

        if envelope.schema_version != PREFS_SCHEMA_VERSION {
            tracing::info!(
                "prefs: schema version mismatch (stored={} current={}) — discarding",
                envelope.schema_version,
                PREFS_SCHEMA_VERSION
            );
            return None;
        }

        Some(envelope.prefs)
    }

    fn save(&self, prefs: &StoredPrefs) {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let envelope = PrefsEnvelope {
            schema_version: PREFS_SCHEMA_VERSION,
            saved_at,
            prefs: prefs.clone(),
        };

        let bytes = match bincode::serialize(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("prefs: failed to serialize: {e}");
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("prefs: failed to create data dir: {e}");
                return;
            }
        }

        let temp = self.path.with_extension("bin.tmp");
        let result = std::fs::write(&temp, &bytes).and_then(|_| std::fs::rename(&temp, &self.path));
        if let Err(e) = result {
            tracing::warn!("prefs: failed to write {}: {e}", self.path.display());
        }
    }
}

impl PreferenceStore for DiskPreferenceStore {
    fn selected_app_id(&self) -> String {
        self.prefs.lock().unwrap().selected_app_id.clone()
    }

    fn set_selected_app_id(&self, id: &str) {
        let mut prefs = self.prefs.lock().unwrap();
        prefs.selected_app_id = id.to_string();
        self.save(&prefs);
    }

    fn app_list(&self) -> Vec<AppRecord> {
        self.prefs.lock().unwrap().apps.clone()
    }

    fn set_app_list(&self, apps: &[AppRecord]) {
        let mut prefs = self.prefs.lock().unwrap();
        prefs.apps = apps.to_vec();
        self.save(&prefs);
    }

    fn set_app_enabled(&self, app_id: &str, enabled: bool) {
        let mut prefs = self.prefs.lock().unwrap();
        if let Some(app) = prefs.apps.iter_mut().find(|a| a.id == app_id) {
            app.enabled = enabled;
        }
        self.save(&prefs);
    }
}

/// In-memory store for tests and embedders that do their own persistence.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    prefs: Mutex<StoredPrefs>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apps(apps: Vec<AppRecord>) -> Self {
        Self {
            prefs: Mutex::new(StoredPrefs {
                selected_app_id: NO_SELECTED_APP.to_string(),
                apps,
            }),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn selected_app_id(&self) -> String {
        self.prefs.lock().unwrap().selected_app_id.clone()
    }

    fn set_selected_app_id(&self, id: &str) {
        self.prefs.lock().unwrap().selected_app_id = id.to_string();
    }

    fn app_list(&self) -> Vec<AppRecord> {
        self.prefs.lock().unwrap().apps.clone()
    }

    fn set_app_list(&self, apps: &[AppRecord]) {
        self.prefs.lock().unwrap().apps = apps.to_vec();
    }

    fn set_app_enabled(&self, app_id: &str, enabled: bool) {
        let mut prefs = self.prefs.lock().unwrap();
        if let Some(app) = prefs.apps.iter_mut().find(|a| a.id == app_id) {
            app.enabled = enabled;
        }
    }
}
