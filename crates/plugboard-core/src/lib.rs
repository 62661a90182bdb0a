pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod remote;
pub mod sinks;
pub mod store;
pub mod tracing_setup;

pub use config::CoreConfig;
pub use error::CatalogError;
pub use models::AppRecord;
pub use remote::{HttpAppService, RemoteAppService};
pub use store::{AppCatalog, CatalogHandle, DiskPreferenceStore, PreferenceStore};
