//! Catalog state manager - single source of truth for the app catalog screen.
//!
//! `AppCatalog` owns the entry list, filter/search state and the selected-app
//! id, and pushes every side effect through injected collaborator traits.
//! `CatalogHandle` wraps it in `Arc<tokio::sync::Mutex<_>>` and drives the
//! async operations, releasing the lock across remote awaits so the per-entry
//! loading latch stays the real guard against duplicate in-flight toggles.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::constants::{capabilities, NO_SELECTED_APP};
use crate::error::CatalogError;
use crate::models::app::is_public_id;
use crate::models::{AppEntry, AppRecord};
use crate::remote::RemoteAppService;
use crate::sinks::{AlertSink, AnalyticsSink, CatalogObserver, LogAlertSink, LogAnalyticsSink, NullObserver};
use crate::store::prefs::PreferenceStore;

/// State owned by the manager. All fields start at their defaults and the
/// whole struct lives for the owning session.
#[derive(Debug)]
pub struct CatalogState {
    /// Arrival order from the last fetch/cache reload; replaced wholesale,
    /// never merged.
    pub entries: Vec<AppEntry>,
    pub selected_app_id: String,
    pub filter_chat: bool,
    pub filter_memories: bool,
    pub filter_external: bool,
    pub search_query: String,
    /// Ownership/visibility of the most recently inspected app. Transient,
    /// overwritten by the next `check_ownership` / `set_app_visibility`.
    pub is_app_owner: bool,
    pub app_public_toggled: bool,
    /// Whole-catalog refresh in progress.
    pub catalog_loading: bool,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            selected_app_id: NO_SELECTED_APP.to_string(),
            filter_chat: true,
            filter_memories: true,
            filter_external: true,
            search_query: String::new(),
            is_app_owner: false,
            app_public_toggled: false,
            catalog_loading: false,
        }
    }
}

/// UI-facing side-effect collaborators, bundled so constructors stay short.
#[derive(Clone)]
pub struct CatalogSinks {
    pub observer: Arc<dyn CatalogObserver>,
    pub alerts: Arc<dyn AlertSink>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

impl Default for CatalogSinks {
    fn default() -> Self {
        Self {
            observer: Arc::new(NullObserver),
            alerts: Arc::new(LogAlertSink),
            analytics: Arc::new(LogAnalyticsSink),
        }
    }
}

pub struct AppCatalog {
    pub state: CatalogState,
    remote: Arc<dyn RemoteAppService>,
    prefs: Arc<dyn PreferenceStore>,
    sinks: CatalogSinks,
}

impl AppCatalog {
    pub fn new(
        remote: Arc<dyn RemoteAppService>,
        prefs: Arc<dyn PreferenceStore>,
        sinks: CatalogSinks,
    ) -> Self {
        Self {
            state: CatalogState::default(),
            remote,
            prefs,
            sinks,
        }
    }

    fn notify(&self) {
        self.sinks.observer.catalog_changed();
    }

    // ===== Query Methods =====

    /// First entry matching the selected id, `None` when nothing is selected
    /// or the selection no longer exists in the list.
    pub fn selected_app(&self) -> Option<&AppRecord> {
        self.state
            .entries
            .iter()
            .map(|e| &e.record)
            .find(|r| r.id == self.state.selected_app_id)
    }

    /// Pure classification of an app id, independent of catalog state.
    pub fn is_public(app_id: &str) -> bool {
        is_public_id(app_id)
    }

    /// Entries passing the capability filters and the search query.
    ///
    /// An app with none of the three known capability tags is always shown;
    /// otherwise at least one of its tags must have its filter switched on.
    /// The search query is a case-insensitive substring match on the name.
    pub fn visible_apps(&self) -> Vec<&AppRecord> {
        let query = self.state.search_query.to_lowercase();
        self.state
            .entries
            .iter()
            .map(|e| &e.record)
            .filter(|r| self.passes_filters(r))
            .filter(|r| query.is_empty() || r.name.to_lowercase().contains(&query))
            .collect()
    }

    fn passes_filters(&self, record: &AppRecord) -> bool {
        let tagged = record.has_capability(capabilities::CHAT)
            || record.has_capability(capabilities::MEMORIES)
            || record.has_capability(capabilities::EXTERNAL_INTEGRATION);
        if !tagged {
            return true;
        }
        (self.state.filter_chat && record.has_capability(capabilities::CHAT))
            || (self.state.filter_memories && record.has_capability(capabilities::MEMORIES))
            || (self.state.filter_external
                && record.has_capability(capabilities::EXTERNAL_INTEGRATION))
    }

    // ===== Mutation Methods =====

    /// `None` restores the previous session's selection from the preference
    /// store; `Some(id)` sets and persists it.
    pub fn set_selected_app(&mut self, id: Option<&str>) {
        match id {
            Some(id) => {
                self.state.selected_app_id = id.to_string();
                self.prefs.set_selected_app_id(id);
            }
            None => {
                self.state.selected_app_id = self.prefs.selected_app_id();
            }
        }
        self.notify();
    }

    /// Caller must hold an index into the current entry list; out-of-range
    /// is a contract violation and panics.
    pub fn set_loading(&mut self, index: usize, value: bool) {
        self.state.entries[index].loading = value;
        self.notify();
    }

    pub fn update_search_query(&mut self, text: &str) {
        self.state.search_query = text.to_string();
        self.notify();
    }

    pub fn clear_search_query(&mut self) {
        self.state.search_query.clear();
        self.notify();
    }

    pub fn toggle_filter_chat(&mut self) {
        self.state.filter_chat = !self.state.filter_chat;
        self.notify();
    }

    pub fn toggle_filter_memories(&mut self) {
        self.state.filter_memories = !self.state.filter_memories;
        self.notify();
    }

    pub fn toggle_filter_external(&mut self) {
        self.state.filter_external = !self.state.filter_external;
        self.notify();
    }

    /// Replaces the entry list from the preference store if it holds any
    /// apps. Signals either way.
    pub fn load_from_cache(&mut self) {
        let cached = self.prefs.app_list();
        if !cached.is_empty() {
            self.replace_entries(cached);
        }
        self.notify();
    }

    /// Writes the current records to the preference store verbatim.
    pub fn persist_to_cache(&self) {
        let records: Vec<AppRecord> = self
            .state
            .entries
            .iter()
            .map(|e| e.record.clone())
            .collect();
        self.prefs.set_app_list(&records);
    }

    /// Unconditional reload from the store; all latches reset to idle.
    fn reload_from_prefs(&mut self) {
        let cached = self.prefs.app_list();
        self.replace_entries(cached);
    }

    fn replace_entries(&mut self, records: Vec<AppRecord>) {
        self.state.entries = records.into_iter().map(AppEntry::new).collect();
    }

    fn remove_local(&mut self, app_id: &str) {
        self.state.entries.retain(|e| e.record.id != app_id);
    }
}

/// Shared, cloneable handle driving the async catalog operations.
#[derive(Clone)]
pub struct CatalogHandle {
    inner: Arc<Mutex<AppCatalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: AppCatalog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(catalog)),
        }
    }

    /// Direct access for synchronous operations and state inspection.
    pub async fn lock(&self) -> MutexGuard<'_, AppCatalog> {
        self.inner.lock().await
    }

    /// Full catalog refresh: fetch, persist to the store, then reload the
    /// entry list *from the store* - the store, not the raw fetch result, is
    /// what the entry list mirrors. On fetch failure the list and the store
    /// keep their pre-call values and only the loading flag is rolled back.
    pub async fn refresh_catalog(&self) -> Result<(), CatalogError> {
        let remote = {
            let mut catalog = self.inner.lock().await;
            catalog.state.catalog_loading = true;
            catalog.notify();
            catalog.remote.clone()
        };

        let fetched = match remote.list_apps().await {
            Ok(apps) => apps,
            Err(e) => {
                tracing::warn!("catalog refresh failed: {e}");
                let mut catalog = self.inner.lock().await;
                catalog.state.catalog_loading = false;
                catalog.notify();
                return Err(e);
            }
        };

        let mut catalog = self.inner.lock().await;
        catalog.prefs.set_app_list(&fetched);
        catalog.reload_from_prefs();
        catalog.state.catalog_loading = false;
        catalog.notify();
        Ok(())
    }

    /// Resets the loading latches on the current (possibly stale) entries,
    /// optionally forces the chat-only filter set, signals immediately, and
    /// spawns the refresh in the background.
    ///
    /// Filters are only touched when `chat_filter_only` is set; the false
    /// branch deliberately leaves whatever values they already had.
    pub async fn initialize(&self, chat_filter_only: bool) {
        {
            let mut catalog = self.inner.lock().await;
            if chat_filter_only {
                catalog.state.filter_chat = true;
                catalog.state.filter_memories = false;
                catalog.state.filter_external = false;
            }
            for entry in &mut catalog.state.entries {
                entry.loading = false;
            }
            catalog.notify();
        }

        let handle = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.refresh_catalog().await {
                tracing::warn!("background refresh after initialize failed: {e}");
            }
        });
    }

    /// Ids containing the private marker short-circuit to owner=true without
    /// a remote round trip; everything else asks the service.
    pub async fn check_ownership(&self, app_id: &str) -> Result<(), CatalogError> {
        if !is_public_id(app_id) {
            let mut catalog = self.inner.lock().await;
            catalog.state.is_app_owner = true;
            catalog.state.app_public_toggled = false;
            catalog.notify();
            return Ok(());
        }

        let remote = self.inner.lock().await.remote.clone();
        let is_owner = remote.check_owner(app_id).await?;

        let mut catalog = self.inner.lock().await;
        catalog.state.is_app_owner = is_owner;
        catalog.state.app_public_toggled = is_owner;
        catalog.notify();
        Ok(())
    }

    pub async fn delete_app(&self, app_id: &str) -> Result<(), CatalogError> {
        let remote = self.inner.lock().await.remote.clone();
        let result = remote.delete(app_id).await;

        let mut catalog = self.inner.lock().await;
        match result {
            Ok(true) => {
                catalog.remove_local(app_id);
                catalog.persist_to_cache();
                catalog.reload_from_prefs();
                catalog.sinks.alerts.show_success("App deleted successfully");
                catalog.notify();
                Ok(())
            }
            Ok(false) => {
                catalog.sinks.alerts.show_error("Failed to delete app");
                catalog.notify();
                Ok(())
            }
            Err(e) => {
                catalog.sinks.alerts.show_error("Failed to delete app");
                catalog.notify();
                Err(e)
            }
        }
    }

    /// Optimistic visibility change: the toggled flag, the local removal and
    /// the success alert all happen before the remote call resolves. The
    /// remote request and a full refresh run as spawned background tasks; a
    /// failing remote call is only logged.
    pub async fn set_app_visibility(&self, app_id: &str, is_public: bool) {
        let remote = {
            let mut catalog = self.inner.lock().await;
            catalog.state.app_public_toggled = is_public;
            catalog.remote.clone()
        };

        let id = app_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = remote.set_visibility(&id, is_public).await {
                tracing::warn!("visibility change for {id} failed: {e}");
            }
        });

        let handle = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.refresh_catalog().await {
                tracing::warn!("background refresh after visibility change failed: {e}");
            }
        });

        let mut catalog = self.inner.lock().await;
        catalog.remove_local(app_id);
        catalog.persist_to_cache();
        catalog.reload_from_prefs();
        catalog.sinks.alerts.show_success("App visibility updated");
        catalog.notify();
    }

    /// Enable or disable one app. The entry's loading latch is the guard: a
    /// second call on the same index while one is pending is a no-op.
    pub async fn toggle_enabled(
        &self,
        app_id: &str,
        enable: bool,
        index: usize,
    ) -> Result<(), CatalogError> {
        let remote = {
            let mut catalog = self.inner.lock().await;
            if catalog.state.entries[index].loading {
                return Ok(());
            }
            catalog.state.entries[index].loading = true;
            catalog.notify();
            catalog.remote.clone()
        };

        if enable {
            match remote.enable(app_id).await {
                Ok(true) => {}
                Ok(false) => {
                    let mut catalog = self.inner.lock().await;
                    catalog.sinks.alerts.show_blocking_dialog(
                        "Error activating the app",
                        "If this is an integration app, make sure the setup is completed.",
                    );
                    clear_latch(&mut catalog, index);
                    catalog.notify();
                    return Ok(());
                }
                Err(e) => {
                    let mut catalog = self.inner.lock().await;
                    clear_latch(&mut catalog, index);
                    catalog.notify();
                    return Err(e);
                }
            }
        } else if let Err(e) = remote.disable(app_id).await {
            // Disable has no failure branch: the local state wins.
            tracing::warn!("remote disable for {app_id} failed: {e}");
        }

        let mut catalog = self.inner.lock().await;
        catalog.prefs.set_app_enabled(app_id, enable);
        if enable {
            catalog.sinks.analytics.record_app_enabled(app_id);
        } else {
            catalog.sinks.analytics.record_app_disabled(app_id);
        }
        clear_latch(&mut catalog, index);
        catalog.reload_from_prefs();
        catalog.notify();
        Ok(())
    }
}

/// The list may have been replaced by a concurrent refresh while the toggle
/// was in flight, so the index is revalidated instead of trusted.
fn clear_latch(catalog: &mut AppCatalog, index: usize) {
    if let Some(entry) = catalog.state.entries.get_mut(index) {
        entry.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::prefs::MemoryPreferenceStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Semaphore;

    fn record(id: &str, name: &str, caps: &[&str]) -> AppRecord {
        AppRecord {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
            enabled: false,
        }
    }

    /// Remote fake with scripted outcomes and per-operation call counts.
    struct FakeService {
        apps: StdMutex<Vec<AppRecord>>,
        list_fails: bool,
        enable_result: Result<bool, ()>,
        delete_result: Result<bool, ()>,
        owner_result: bool,
        visibility_fails: bool,
        enable_calls: AtomicUsize,
        disable_calls: AtomicUsize,
        owner_calls: AtomicUsize,
        visibility_calls: AtomicUsize,
        /// When present, `enable` blocks on this gate before answering.
        enable_gate: Option<Semaphore>,
    }

    impl FakeService {
        fn with_apps(apps: Vec<AppRecord>) -> Self {
            Self {
                apps: StdMutex::new(apps),
                list_fails: false,
                enable_result: Ok(true),
                delete_result: Ok(true),
                owner_result: false,
                visibility_fails: false,
                enable_calls: AtomicUsize::new(0),
                disable_calls: AtomicUsize::new(0),
                owner_calls: AtomicUsize::new(0),
                visibility_calls: AtomicUsize::new(0),
                enable_gate: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl RemoteAppService for FakeService {
        async fn list_apps(&self) -> Result<Vec<AppRecord>, CatalogError> {
            if self.list_fails {
                return Err(CatalogError::Remote {
                    message: "listing unavailable".to_string(),
                });
            }
            Ok(self.apps.lock().unwrap().clone())
        }

        async fn enable(&self, _app_id: &str) -> Result<bool, CatalogError> {
            self.enable_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref gate) = self.enable_gate {
                let permit = gate.acquire().await.unwrap();
                permit.forget();
            }
            self.enable_result.map_err(|_| CatalogError::Remote {
                message: "enable failed".to_string(),
            })
        }

        async fn disable(&self, _app_id: &str) -> Result<(), CatalogError> {
            self.disable_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete(&self, _app_id: &str) -> Result<bool, CatalogError> {
            self.delete_result.map_err(|_| CatalogError::Remote {
                message: "delete failed".to_string(),
            })
        }

        async fn check_owner(&self, _app_id: &str) -> Result<bool, CatalogError> {
            self.owner_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.owner_result)
        }

        async fn set_visibility(&self, _app_id: &str, _is_public: bool) -> Result<(), CatalogError> {
            self.visibility_calls.fetch_add(1, Ordering::SeqCst);
            if self.visibility_fails {
                return Err(CatalogError::Remote {
                    message: "visibility change failed".to_string(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        notifications: AtomicUsize,
    }

    impl CatalogObserver for RecordingObserver {
        fn catalog_changed(&self) {
            self.notifications.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingAlerts {
        errors: StdMutex<Vec<String>>,
        successes: StdMutex<Vec<String>>,
        dialogs: StdMutex<Vec<(String, String)>>,
    }

    impl AlertSink for RecordingAlerts {
        fn show_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn show_success(&self, message: &str) {
            self.successes.lock().unwrap().push(message.to_string());
        }

        fn show_blocking_dialog(&self, title: &str, content: &str) {
            self.dialogs
                .lock()
                .unwrap()
                .push((title.to_string(), content.to_string()));
        }
    }

    #[derive(Default)]
    struct RecordingAnalytics {
        enabled: StdMutex<Vec<String>>,
        disabled: StdMutex<Vec<String>>,
    }

    impl AnalyticsSink for RecordingAnalytics {
        fn record_app_enabled(&self, app_id: &str) {
            self.enabled.lock().unwrap().push(app_id.to_string());
        }

        fn record_app_disabled(&self, app_id: &str) {
            self.disabled.lock().unwrap().push(app_id.to_string());
        }
    }

    struct Harness {
        handle: CatalogHandle,
        service: Arc<FakeService>,
        prefs: Arc<MemoryPreferenceStore>,
        observer: Arc<RecordingObserver>,
        alerts: Arc<RecordingAlerts>,
        analytics: Arc<RecordingAnalytics>,
    }

    fn harness(service: FakeService) -> Harness {
        harness_with_prefs(service, MemoryPreferenceStore::new())
    }

    fn harness_with_prefs(service: FakeService, prefs: MemoryPreferenceStore) -> Harness {
        let service = Arc::new(service);
        let prefs = Arc::new(prefs);
        let observer = Arc::new(RecordingObserver::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let analytics = Arc::new(RecordingAnalytics::default());
        let sinks = CatalogSinks {
            observer: observer.clone(),
            alerts: alerts.clone(),
            analytics: analytics.clone(),
        };
        let catalog = AppCatalog::new(service.clone(), prefs.clone(), sinks);
        Harness {
            handle: CatalogHandle::new(catalog),
            service,
            prefs,
            observer,
            alerts,
            analytics,
        }
    }

    fn sample_apps() -> Vec<AppRecord> {
        vec![
            record("weather", "Weather", &["chat"]),
            record("private_notes", "My Notes", &["memories"]),
            record("zapier_hook", "Zapier", &["external_integration"]),
        ]
    }

    #[tokio::test]
    async fn refresh_replaces_entries_with_idle_latches() {
        let h = harness(FakeService::with_apps(sample_apps()));
        h.handle.refresh_catalog().await.unwrap();

        let catalog = h.handle.lock().await;
        assert_eq!(catalog.state.entries.len(), 3);
        assert!(catalog.state.entries.iter().all(|e| !e.loading));
        assert!(!catalog.state.catalog_loading);
        // The store is the source of truth the entry list mirrors.
        assert_eq!(h.prefs.app_list().len(), 3);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_state_and_clears_loading() {
        let mut service = FakeService::with_apps(sample_apps());
        service.list_fails = true;
        let h = harness_with_prefs(
            service,
            MemoryPreferenceStore::with_apps(vec![record("old", "Old", &["chat"])]),
        );
        {
            let mut catalog = h.handle.lock().await;
            catalog.load_from_cache();
        }

        let result = h.handle.refresh_catalog().await;
        assert!(result.is_err());

        let catalog = h.handle.lock().await;
        assert_eq!(catalog.state.entries.len(), 1);
        assert_eq!(catalog.state.entries[0].record.id, "old");
        assert!(!catalog.state.catalog_loading);
        assert_eq!(h.prefs.app_list().len(), 1);
    }

    #[tokio::test]
    async fn selected_app_with_sentinel_is_none() {
        let h = harness(FakeService::with_apps(sample_apps()));
        h.handle.refresh_catalog().await.unwrap();

        let catalog = h.handle.lock().await;
        assert_eq!(catalog.state.selected_app_id, NO_SELECTED_APP);
        assert!(catalog.selected_app().is_none());
    }

    #[tokio::test]
    async fn set_selected_app_persists_and_restores() {
        let h = harness(FakeService::with_apps(sample_apps()));
        h.handle.refresh_catalog().await.unwrap();

        {
            let mut catalog = h.handle.lock().await;
            catalog.set_selected_app(Some("weather"));
            assert_eq!(catalog.selected_app().unwrap().name, "Weather");
        }
        assert_eq!(h.prefs.selected_app_id(), "weather");

        // None restores from the store, e.g. after state was rebuilt.
        let mut catalog = h.handle.lock().await;
        catalog.state.selected_app_id = NO_SELECTED_APP.to_string();
        catalog.set_selected_app(None);
        assert_eq!(catalog.state.selected_app_id, "weather");
    }

    #[test]
    fn is_public_follows_id_marker() {
        assert!(!AppCatalog::is_public("private_app_1"));
        assert!(AppCatalog::is_public("pub_app_2"));
    }

    #[tokio::test]
    async fn concurrent_toggles_on_same_index_invoke_remote_once() {
        let mut service = FakeService::with_apps(sample_apps());
        service.enable_gate = Some(Semaphore::new(0));
        let h = harness(service);
        h.handle.refresh_catalog().await.unwrap();

        let first = {
            let handle = h.handle.clone();
            tokio::spawn(async move { handle.toggle_enabled("weather", true, 0).await })
        };

        // Let the first toggle reach the gated remote call.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(h.service.enable_calls.load(Ordering::SeqCst), 1);

        // Second call sees the latch and is a no-op.
        h.handle.toggle_enabled("weather", true, 0).await.unwrap();
        assert_eq!(h.service.enable_calls.load(Ordering::SeqCst), 1);

        h.service.enable_gate.as_ref().unwrap().add_permits(1);
        first.await.unwrap().unwrap();
        assert_eq!(h.service.enable_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn enable_failure_shows_dialog_and_resets_latch() {
        let mut service = FakeService::with_apps(sample_apps());
        service.enable_result = Ok(false);
        let h = harness(service);
        h.handle.refresh_catalog().await.unwrap();

        h.handle.toggle_enabled("weather", true, 0).await.unwrap();

        let catalog = h.handle.lock().await;
        assert!(!catalog.state.entries[0].loading);
        assert_eq!(catalog.state.entries.len(), 3);
        assert_eq!(h.alerts.dialogs.lock().unwrap().len(), 1);
        // Early return: the store's enabled flag was never touched.
        assert!(!h.prefs.app_list()[0].enabled);
        assert!(h.analytics.enabled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn enable_success_updates_store_and_analytics() {
        let h = harness(FakeService::with_apps(sample_apps()));
        h.handle.refresh_catalog().await.unwrap();

        h.handle.toggle_enabled("weather", true, 0).await.unwrap();

        let catalog = h.handle.lock().await;
        assert!(catalog.state.entries[0].record.enabled);
        assert!(!catalog.state.entries[0].loading);
        assert_eq!(h.analytics.enabled.lock().unwrap().as_slice(), ["weather"]);
    }

    #[tokio::test]
    async fn disable_always_applies_locally() {
        let h = harness(FakeService::with_apps(sample_apps()));
        h.handle.refresh_catalog().await.unwrap();
        h.handle.toggle_enabled("weather", true, 0).await.unwrap();

        h.handle.toggle_enabled("weather", false, 0).await.unwrap();

        let catalog = h.handle.lock().await;
        assert!(!catalog.state.entries[0].record.enabled);
        assert_eq!(h.service.disable_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.analytics.disabled.lock().unwrap().as_slice(), ["weather"]);
    }

    #[tokio::test]
    async fn delete_success_removes_record_everywhere() {
        let h = harness(FakeService::with_apps(sample_apps()));
        h.handle.refresh_catalog().await.unwrap();

        h.handle.delete_app("weather").await.unwrap();

        let catalog = h.handle.lock().await;
        assert!(catalog.state.entries.iter().all(|e| e.record.id != "weather"));
        assert!(h.prefs.app_list().iter().all(|a| a.id != "weather"));
        assert_eq!(h.alerts.successes.lock().unwrap().len(), 1);

        // A fresh state rebuilt from the same store agrees.
        drop(catalog);
        let mut fresh = AppCatalog::new(h.service.clone(), h.prefs.clone(), CatalogSinks::default());
        fresh.load_from_cache();
        assert!(fresh.state.entries.iter().all(|e| e.record.id != "weather"));
    }

    #[tokio::test]
    async fn delete_failure_leaves_entries_and_reports_error() {
        let mut service = FakeService::with_apps(sample_apps());
        service.delete_result = Ok(false);
        let h = harness(service);
        h.handle.refresh_catalog().await.unwrap();

        h.handle.delete_app("weather").await.unwrap();

        let catalog = h.handle.lock().await;
        assert_eq!(catalog.state.entries.len(), 3);
        assert_eq!(h.alerts.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn check_ownership_short_circuits_private_ids() {
        let h = harness(FakeService::with_apps(sample_apps()));

        h.handle.check_ownership("private_notes").await.unwrap();

        let catalog = h.handle.lock().await;
        assert!(catalog.state.is_app_owner);
        assert!(!catalog.state.app_public_toggled);
        assert_eq!(h.service.owner_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn check_ownership_uses_remote_for_public_ids() {
        let mut service = FakeService::with_apps(sample_apps());
        service.owner_result = true;
        let h = harness(service);

        h.handle.check_ownership("weather").await.unwrap();

        let catalog = h.handle.lock().await;
        assert!(catalog.state.is_app_owner);
        assert!(catalog.state.app_public_toggled);
        assert_eq!(h.service.owner_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn visibility_is_optimistic_even_when_remote_fails() {
        let mut service = FakeService::with_apps(sample_apps());
        service.visibility_fails = true;
        let h = harness(service);
        h.handle.refresh_catalog().await.unwrap();

        h.handle.set_app_visibility("private_notes", true).await;

        // Toggled flag, removal and success alert all land before the
        // spawned remote call has run at all.
        let catalog = h.handle.lock().await;
        assert!(catalog.state.app_public_toggled);
        assert!(catalog
            .state
            .entries
            .iter()
            .all(|e| e.record.id != "private_notes"));
        assert_eq!(h.alerts.successes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn visibility_reports_success_before_remote_completes() {
        let h = harness(FakeService::with_apps(sample_apps()));
        h.handle.refresh_catalog().await.unwrap();

        h.handle.set_app_visibility("weather", false).await;
        assert!(!h.handle.lock().await.state.app_public_toggled);
        assert_eq!(h.alerts.successes.lock().unwrap().len(), 1);

        // Background tasks eventually issue the remote call and refresh.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(h.service.visibility_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn initialize_forces_chat_only_filters_and_spawns_refresh() {
        let h = harness(FakeService::with_apps(sample_apps()));
        {
            let mut catalog = h.handle.lock().await;
            catalog.state.filter_memories = true;
            catalog.state.filter_external = true;
        }

        h.handle.initialize(true).await;

        {
            let catalog = h.handle.lock().await;
            assert!(catalog.state.filter_chat);
            assert!(!catalog.state.filter_memories);
            assert!(!catalog.state.filter_external);
        }

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        let catalog = h.handle.lock().await;
        assert_eq!(catalog.state.entries.len(), 3);
    }

    #[tokio::test]
    async fn initialize_leaves_filters_when_not_chat_only() {
        let h = harness(FakeService::with_apps(sample_apps()));
        {
            let mut catalog = h.handle.lock().await;
            catalog.state.filter_chat = false;
            catalog.state.filter_memories = false;
        }

        h.handle.initialize(false).await;

        let catalog = h.handle.lock().await;
        assert!(!catalog.state.filter_chat);
        assert!(!catalog.state.filter_memories);
        assert!(catalog.state.filter_external);
    }

    #[tokio::test]
    async fn load_from_cache_skips_empty_store_but_signals() {
        let h = harness(FakeService::with_apps(sample_apps()));
        let before = h.observer.notifications.load(Ordering::SeqCst);

        let mut catalog = h.handle.lock().await;
        catalog.load_from_cache();
        assert!(catalog.state.entries.is_empty());
        assert_eq!(h.observer.notifications.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn search_and_filters_shape_the_visible_list() {
        let h = harness(FakeService::with_apps(sample_apps()));
        h.handle.refresh_catalog().await.unwrap();

        let mut catalog = h.handle.lock().await;
        assert_eq!(catalog.visible_apps().len(), 3);

        catalog.toggle_filter_external();
        assert!(catalog
            .visible_apps()
            .iter()
            .all(|r| r.id != "zapier_hook"));

        catalog.update_search_query("weath");
        let visible = catalog.visible_apps();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "weather");

        catalog.clear_search_query();
        assert_eq!(catalog.state.search_query, "");
    }

    #[tokio::test]
    #[should_panic]
    async fn set_loading_out_of_range_panics() {
        let h = harness(FakeService::with_apps(Vec::new()));
        let mut catalog = h.handle.lock().await;
        catalog.set_loading(0, true);
    }
}
