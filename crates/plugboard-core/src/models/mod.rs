pub mod app;

pub use app::{AppEntry, AppRecord};
