use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use plugboard_core::sinks::{AlertSink, AnalyticsSink, CatalogObserver};
use plugboard_core::store::CatalogSinks;
use plugboard_core::{
    AppCatalog, CatalogHandle, CoreConfig, DiskPreferenceStore, HttpAppService,
};

#[derive(Parser)]
#[command(name = "plugboard")]
#[command(about = "CLI for the plugboard app catalog")]
struct Cli {
    /// Catalog API base URL (defaults to the production endpoint)
    #[arg(long)]
    api_url: Option<String>,

    /// API key; falls back to PLUGBOARD_API_KEY
    #[arg(long)]
    api_key: Option<String>,

    /// Data directory for cached preferences
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List apps in the catalog
    List {
        /// Only show chat apps
        #[arg(long)]
        chat_only: bool,
        /// Filter by a name substring
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Enable an app
    Enable { app_id: String },

    /// Disable an app
    Disable { app_id: String },

    /// Delete an app
    Delete { app_id: String },

    /// Select an app (persisted across sessions)
    Select { app_id: String },

    /// Show the currently selected app
    Selected,

    /// Change an app's visibility
    Visibility {
        app_id: String,
        #[arg(long, conflicts_with = "private")]
        public: bool,
        #[arg(long)]
        private: bool,
    },

    /// Check whether you own an app
    Owner { app_id: String },
}

/// Console renditions of the UI sinks.
struct ConsoleAlerts;

impl AlertSink for ConsoleAlerts {
    fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn show_success(&self, message: &str) {
        println!("{message}");
    }

    fn show_blocking_dialog(&self, title: &str, content: &str) {
        eprintln!("{title}\n  {content}");
    }
}

struct ConsoleAnalytics;

impl AnalyticsSink for ConsoleAnalytics {
    fn record_app_enabled(&self, app_id: &str) {
        tracing::debug!(app_id, "app enabled");
    }

    fn record_app_disabled(&self, app_id: &str) {
        tracing::debug!(app_id, "app disabled");
    }
}

struct QuietObserver;

impl CatalogObserver for QuietObserver {
    fn catalog_changed(&self) {}
}

fn build_handle(cli: &Cli) -> Result<CatalogHandle> {
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => dirs::data_dir()
            .context("Could not determine a data directory; pass --data-dir")?
            .join("plugboard"),
    };

    let mut config = CoreConfig::new(&data_dir);
    if let Some(url) = &cli.api_url {
        config = config.with_api_base_url(url.clone());
    }
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("PLUGBOARD_API_KEY").ok());
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }

    let remote = Arc::new(HttpAppService::new(
        config.api_base_url.clone(),
        config.api_key.clone(),
    ));
    let prefs = Arc::new(DiskPreferenceStore::new(&config.data_dir));
    let sinks = CatalogSinks {
        observer: Arc::new(QuietObserver),
        alerts: Arc::new(ConsoleAlerts),
        analytics: Arc::new(ConsoleAnalytics),
    };

    Ok(CatalogHandle::new(AppCatalog::new(remote, prefs, sinks)))
}

/// Enable/disable need an index into the current entry list; resolve it from
/// the freshly refreshed catalog.
async fn find_index(handle: &CatalogHandle, app_id: &str) -> Result<usize> {
    let catalog = handle.lock().await;
    catalog
        .state
        .entries
        .iter()
        .position(|e| e.record.id == app_id)
        .with_context(|| format!("No app with id '{}' in the catalog", app_id))
}

#[tokio::main]
async fn main() -> Result<()> {
    plugboard_core::tracing_setup::init_tracing_with_service("plugboard-cli");

    let cli = Cli::parse();
    let handle = build_handle(&cli)?;

    match &cli.command {
        Commands::List { chat_only, search } => {
            handle.refresh_catalog().await?;
            let mut catalog = handle.lock().await;
            if *chat_only {
                catalog.state.filter_memories = false;
                catalog.state.filter_external = false;
            }
            if let Some(query) = search {
                catalog.update_search_query(query);
            }
            let visible = catalog.visible_apps();
            if visible.is_empty() {
                println!("No apps match.");
            }
            for app in visible {
                let status = if app.enabled { "enabled" } else { "disabled" };
                let visibility = if app.is_public() { "public" } else { "private" };
                println!("{:<24} {:<9} {:<8} {}", app.id, status, visibility, app.name);
            }
        }
        Commands::Enable { app_id } => {
            handle.refresh_catalog().await?;
            let index = find_index(&handle, app_id).await?;
            handle.toggle_enabled(app_id, true, index).await?;
            println!("{} enabled", app_id);
        }
        Commands::Disable { app_id } => {
            handle.refresh_catalog().await?;
            let index = find_index(&handle, app_id).await?;
            handle.toggle_enabled(app_id, false, index).await?;
            println!("{} disabled", app_id);
        }
        Commands::Delete { app_id } => {
            handle.refresh_catalog().await?;
            handle.delete_app(app_id).await?;
        }
        Commands::Select { app_id } => {
            handle.refresh_catalog().await?;
            let mut catalog = handle.lock().await;
            catalog.set_selected_app(Some(app_id));
            println!("Selected {}", app_id);
        }
        Commands::Selected => {
            let mut catalog = handle.lock().await;
            catalog.load_from_cache();
            catalog.set_selected_app(None);
            match catalog.selected_app() {
                Some(app) => println!("{} ({})", app.id, app.name),
                None => println!("No app selected."),
            }
        }
        Commands::Visibility {
            app_id,
            public,
            private,
        } => {
            if !public && !private {
                anyhow::bail!("Pass --public or --private");
            }
            handle.refresh_catalog().await?;
            handle.set_app_visibility(app_id, *public).await;
            // The remote call runs as a background task; give it a moment to
            // land before the process exits.
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        Commands::Owner { app_id } => {
            handle.check_ownership(app_id).await?;
            let catalog = handle.lock().await;
            if catalog.state.is_app_owner {
                println!("You own {}", app_id);
            } else {
                println!("You do not own {}", app_id);
            }
        }
    }

    Ok(())
}
