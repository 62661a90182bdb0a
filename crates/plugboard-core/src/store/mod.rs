pub mod catalog;
pub mod prefs;

pub use catalog::{AppCatalog, CatalogHandle, CatalogSinks, CatalogState};
pub use prefs::{DiskPreferenceStore, MemoryPreferenceStore, PreferenceStore};
