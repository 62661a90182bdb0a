use serde::{Deserialize, Serialize};

use crate::constants::PRIVATE_ID_MARKER;

/// One catalog entry describing an installable third-party integration.
///
/// Everything except `id` and `enabled` is display metadata the catalog
/// carries around opaquely for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Capability tags ("chat", "memories", "external_integration")
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
}

impl AppRecord {
    /// Visibility class is a naming convention: ids containing "private"
    /// are private (owned) apps, everything else is public.
    pub fn is_public(&self) -> bool {
        is_public_id(&self.id)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Pure classification of an app id, no catalog state involved.
pub fn is_public_id(app_id: &str) -> bool {
    !app_id.contains(PRIVATE_ID_MARKER)
}

/// An app record paired with its in-flight latch. The pairing replaces the
/// index-aligned record/loading lists the catalog would otherwise have to
/// keep in sync by hand.
#[derive(Debug, Clone)]
pub struct AppEntry {
    pub record: AppRecord,
    pub loading: bool,
}

impl AppEntry {
    pub fn new(record: AppRecord) -> Self {
        Self {
            record,
            loading: false,
        }
    }
}
