//! Collaborator seams the catalog pushes UI-facing side effects through.
//!
//! The catalog itself never renders anything; it calls these traits and the
//! embedding surface (TUI, CLI, mobile shell) decides what a "snackbar" or a
//! "blocking dialog" looks like. Tests substitute recording fakes.

/// Re-render trigger, invoked after every state mutation.
pub trait CatalogObserver: Send + Sync {
    fn catalog_changed(&self);
}

/// User-facing alerts: transient snackbars and modal dialogs.
pub trait AlertSink: Send + Sync {
    fn show_error(&self, message: &str);
    fn show_success(&self, message: &str);
    fn show_blocking_dialog(&self, title: &str, content: &str);
}

/// Product analytics events for enable/disable actions.
pub trait AnalyticsSink: Send + Sync {
    fn record_app_enabled(&self, app_id: &str);
    fn record_app_disabled(&self, app_id: &str);
}

/// Observer that drops every notification. Useful for headless callers that
/// poll state instead of reacting to change signals.
pub struct NullObserver;

impl CatalogObserver for NullObserver {
    fn catalog_changed(&self) {}
}

/// Alert sink that routes everything to tracing instead of a UI.
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn show_error(&self, message: &str) {
        tracing::warn!("alert: {message}");
    }

    fn show_success(&self, message: &str) {
        tracing::info!("alert: {message}");
    }

    fn show_blocking_dialog(&self, title: &str, content: &str) {
        tracing::warn!("dialog [{title}]: {content}");
    }
}

/// Analytics sink that only logs. Stands in until a real pipeline is wired.
pub struct LogAnalyticsSink;

impl AnalyticsSink for LogAnalyticsSink {
    fn record_app_enabled(&self, app_id: &str) {
        tracing::info!(app_id, "analytics: app enabled");
    }

    fn record_app_disabled(&self, app_id: &str) {
        tracing::info!(app_id, "analytics: app disabled");
    }
}
