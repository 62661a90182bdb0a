//! Application-wide constants
//!
//! Centralized location for magic strings and defaults that are used
//! across multiple modules.

/// Default base URL for the app catalog API
pub const API_BASE_URL: &str = "https://api.plugboard.dev/v2";

/// Sentinel stored when the user has never picked an app
pub const NO_SELECTED_APP: &str = "no_selected";

/// Substring in an app id that marks it as a private (owned) app
pub const PRIVATE_ID_MARKER: &str = "private";

// Capability tags carried in AppRecord metadata, matched by the catalog filters
pub mod capabilities {
    pub const CHAT: &str = "chat";
    pub const MEMORIES: &str = "memories";
    pub const EXTERNAL_INTEGRATION: &str = "external_integration";
}
